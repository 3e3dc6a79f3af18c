use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open range of paths, `[lower, upper)`.
///
/// `None` on either side means the range is unbounded in that direction.
/// Shards handed to compaction workers are disjoint, contiguous ranges that
/// together cover the whole key space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathRange {
    pub lower: Option<String>,
    pub upper: Option<String>,
}

impl PathRange {
    /// The range covering every path.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn new(lower: Option<String>, upper: Option<String>) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` if `path` falls inside the range.
    pub fn contains(&self, path: &str) -> bool {
        if let Some(lower) = &self.lower {
            if path < lower.as_str() {
                return false;
            }
        }
        match &self.upper {
            Some(upper) => path < upper.as_str(),
            None => true,
        }
    }

    /// Returns `true` if both sides are unbounded.
    pub fn is_full(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

impl fmt::Display for PathRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = self.lower.as_deref().unwrap_or("");
        match &self.upper {
            Some(upper) => write!(f, "[{lower:?}, {upper:?})"),
            None => write!(f, "[{lower:?}, ∞)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_range_contains_everything() {
        let range = PathRange::full();
        assert!(range.is_full());
        assert!(range.contains(""));
        assert!(range.contains("/zzz"));
    }

    #[test]
    fn bounds_are_half_open() {
        let range = PathRange::new(Some("/b".into()), Some("/d".into()));
        assert!(!range.contains("/a"));
        assert!(range.contains("/b"));
        assert!(range.contains("/c/file"));
        assert!(!range.contains("/d"));
    }

    #[test]
    fn display_marks_unbounded_upper() {
        let range = PathRange::new(Some("/m".into()), None);
        assert_eq!(range.to_string(), "[\"/m\", ∞)");
    }

    proptest! {
        #[test]
        fn split_point_partitions_paths(split in "[a-z]{1,4}", path in "[a-z]{0,6}") {
            let left = PathRange::new(None, Some(split.clone()));
            let right = PathRange::new(Some(split), None);
            prop_assert!(left.contains(&path) ^ right.contains(&path));
        }
    }
}

use serde::{Deserialize, Serialize};
use strata_types::FilesetId;

use crate::error::{StoreError, StoreResult};

const PRIMITIVE_DOMAIN: &str = "strata-primitive-v1";
const COMPOSITE_DOMAIN: &str = "strata-composite-v1";
const EMPTY_DOMAIN: &str = "strata-empty-v1";

// ---------------------------------------------------------------------------
// FileEntry
// ---------------------------------------------------------------------------

/// A single path and its content inside a primitive layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    /// Bytes this entry contributes to its layer's size.
    pub fn size_bytes(&self) -> i64 {
        (self.path.len() + self.data.len()) as i64
    }
}

// ---------------------------------------------------------------------------
// Primitive
// ---------------------------------------------------------------------------

/// A leaf layer: path-indexed entries plus the layer's byte size.
///
/// `size_bytes` is the only input to the compaction ordering decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primitive {
    pub size_bytes: i64,
    /// Entries sorted by path, one per path.
    pub entries: Vec<FileEntry>,
}

impl Primitive {
    /// Build a layer from entries in any order.
    ///
    /// Entries are sorted by path. When a path appears more than once the
    /// last occurrence wins.
    pub fn new(mut entries: Vec<FileEntry>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        let mut deduped: Vec<FileEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match deduped.last_mut() {
                Some(last) if last.path == entry.path => *last = entry,
                _ => deduped.push(entry),
            }
        }
        let size_bytes = deduped.iter().map(FileEntry::size_bytes).sum();
        Self {
            size_bytes,
            entries: deduped,
        }
    }

    /// Look up an entry by path.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// First and last path in the layer.
    pub fn key_bounds(&self) -> Option<(&str, &str)> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some((first.path.as_str(), last.path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// A layer defined as an ordered list of other filesets.
///
/// Layers are stored in their encoded form and decoded on demand by
/// [`Composite::points_to`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composite {
    pub layers: Vec<String>,
}

impl Composite {
    pub fn new(ids: &[FilesetId]) -> Self {
        Self {
            layers: ids.iter().map(FilesetId::to_hex).collect(),
        }
    }

    /// Decode the pointer list, in order.
    pub fn points_to(&self) -> StoreResult<Vec<FilesetId>> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                FilesetId::from_hex(layer).map_err(|e| StoreError::MalformedComposite {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Stored description of a fileset.
///
/// `Empty` is a valid but degenerate state: metadata exists but carries
/// neither variant. Operations that are undefined for it must say so rather
/// than treat it as one of the other two.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metadata {
    Primitive(Primitive),
    Composite(Composite),
    Empty,
}

impl Metadata {
    /// Derive the id this metadata is stored under.
    pub fn compute_id(&self) -> StoreResult<FilesetId> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let domain = match self {
            Self::Primitive(_) => PRIMITIVE_DOMAIN,
            Self::Composite(_) => COMPOSITE_DOMAIN,
            Self::Empty => EMPTY_DOMAIN,
        };
        Ok(FilesetId::derive(domain, &data))
    }

    /// Short name of the variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Composite(_) => "composite",
            Self::Empty => "empty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sorts_and_sizes_entries() {
        let prim = Primitive::new(vec![
            FileEntry::new("/b", b"22".to_vec()),
            FileEntry::new("/a", b"1".to_vec()),
        ]);
        assert_eq!(prim.entries[0].path, "/a");
        assert_eq!(prim.entries[1].path, "/b");
        assert_eq!(prim.size_bytes, 2 + 1 + 2 + 2);
        assert_eq!(prim.key_bounds(), Some(("/a", "/b")));
    }

    #[test]
    fn primitive_last_duplicate_wins() {
        let prim = Primitive::new(vec![
            FileEntry::new("/a", b"old".to_vec()),
            FileEntry::new("/b", b"x".to_vec()),
            FileEntry::new("/a", b"new".to_vec()),
        ]);
        assert_eq!(prim.len(), 2);
        assert_eq!(prim.get("/a").unwrap().data, b"new");
        assert!(prim.get("/c").is_none());
    }

    #[test]
    fn empty_primitive() {
        let prim = Primitive::new(Vec::new());
        assert!(prim.is_empty());
        assert_eq!(prim.size_bytes, 0);
        assert!(prim.key_bounds().is_none());
    }

    #[test]
    fn composite_points_to_in_order() {
        let a = FilesetId::from_hash([1; 32]);
        let b = FilesetId::from_hash([2; 32]);
        let composite = Composite::new(&[b, a]);
        assert_eq!(composite.points_to().unwrap(), vec![b, a]);
    }

    #[test]
    fn composite_rejects_malformed_layer() {
        let composite = Composite {
            layers: vec![FilesetId::from_hash([1; 32]).to_hex(), "zz".into()],
        };
        let err = composite.points_to().unwrap_err();
        assert!(matches!(err, StoreError::MalformedComposite { index: 1, .. }));
    }

    #[test]
    fn ids_are_content_derived() {
        let prim = Metadata::Primitive(Primitive::new(vec![FileEntry::new("/a", b"1".to_vec())]));
        assert_eq!(prim.compute_id().unwrap(), prim.clone().compute_id().unwrap());

        let other = Metadata::Primitive(Primitive::new(vec![FileEntry::new("/a", b"2".to_vec())]));
        assert_ne!(prim.compute_id().unwrap(), other.compute_id().unwrap());
    }

    #[test]
    fn variants_never_share_ids() {
        let composite = Metadata::Composite(Composite::new(&[]));
        let primitive = Metadata::Primitive(Primitive::new(Vec::new()));
        let ids = [
            composite.compute_id().unwrap(),
            primitive.compute_id().unwrap(),
            Metadata::Empty.compute_id().unwrap(),
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Metadata::Empty.kind(), "empty");
        assert_eq!(Metadata::Composite(Composite::new(&[])).kind(), "composite");
        assert_eq!(Metadata::Primitive(Primitive::new(Vec::new())).kind(), "primitive");
    }
}

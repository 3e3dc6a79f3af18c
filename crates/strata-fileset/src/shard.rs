use std::collections::BTreeMap;

use strata_types::{FilesetId, PathRange};
use tracing::debug;

use crate::error::FilesetResult;
use crate::storage::Storage;

impl Storage {
    /// Split the paths spanned by `ids` into contiguous, disjoint ranges.
    ///
    /// Ranges are visited in ascending path order. A range closes once the
    /// bytes it covers across all inputs reach `shard_size_threshold`, or its
    /// path count reaches `shard_count_threshold`. The first range has no
    /// lower bound and the last has no upper bound, so together they cover
    /// every path. At least one range is always visited.
    ///
    /// An error from `visit` stops enumeration and is returned as is.
    pub fn shard<F>(&self, ids: &[FilesetId], mut visit: F) -> FilesetResult<()>
    where
        F: FnMut(PathRange) -> FilesetResult<()>,
    {
        let flat = self.flatten(ids)?;
        let mut path_sizes: BTreeMap<String, i64> = BTreeMap::new();
        for primitive in self.get_primitive_batch(&flat)? {
            for entry in &primitive.entries {
                *path_sizes.entry(entry.path.clone()).or_default() += entry.size_bytes();
            }
        }

        let size_threshold = self.config().shard_size_threshold;
        let count_threshold = self.config().shard_count_threshold;
        let mut lower: Option<String> = None;
        let mut size = 0i64;
        let mut count = 0usize;
        let mut shards = 0usize;
        for (path, path_size) in path_sizes {
            if count > 0 && (size >= size_threshold || count >= count_threshold) {
                let upper = Some(path.clone());
                visit(PathRange::new(lower.replace(path.clone()), upper))?;
                shards += 1;
                size = 0;
                count = 0;
            }
            size += path_size;
            count += 1;
        }
        visit(PathRange::new(lower, None))?;
        debug!(inputs = flat.len(), shards = shards + 1, "sharded filesets");
        Ok(())
    }
}

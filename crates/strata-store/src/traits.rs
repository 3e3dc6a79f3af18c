use std::time::Duration;

use strata_types::FilesetId;

use crate::error::StoreResult;
use crate::metadata::Metadata;

/// Keyed store for fileset metadata.
///
/// All implementations must satisfy these invariants:
/// - Metadata is immutable once written. The id returned by `put` is derived
///   from the metadata, so the same metadata always maps to the same id.
/// - Concurrent reads are always safe.
/// - All lookup errors are propagated, never silently ignored.
pub trait MetadataStore: Send + Sync {
    /// Read the metadata for `id`.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if no
    /// metadata is stored under `id`.
    fn get(&self, id: &FilesetId) -> StoreResult<Metadata>;

    /// Write metadata that should live for at least `ttl`, returning its id.
    ///
    /// Writing metadata that already exists is a no-op apart from extending
    /// its expiry.
    fn put(&self, metadata: &Metadata, ttl: Duration) -> StoreResult<FilesetId>;

    /// Check whether metadata exists for `id`.
    fn exists(&self, id: &FilesetId) -> StoreResult<bool>;

    /// Read metadata for several ids, failing on the first missing one.
    fn get_batch(&self, ids: &[FilesetId]) -> StoreResult<Vec<Metadata>> {
        ids.iter().map(|id| self.get(id)).collect()
    }
}

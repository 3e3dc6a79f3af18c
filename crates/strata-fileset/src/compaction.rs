//! Leveled compaction.
//!
//! A list of primitive layers is *compacted* when every layer is at least
//! `level_factor` times the size of the layer after it. Compaction merges
//! the shortest suffix that breaks this relationship, then checks again,
//! until the whole list holds it.

use std::time::Duration;

use async_trait::async_trait;
use strata_store::{Metadata, Primitive};
use strata_types::FilesetId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FilesetError, FilesetResult};
use crate::storage::Storage;

/// Something that can compact a list of filesets into one.
///
/// [`Storage`] compacts sequentially in-process;
/// [`DistributedCompactor`](crate::DistributedCompactor) fans the work out
/// to a [`CompactionWorker`](crate::CompactionWorker).
#[async_trait]
pub trait Compactor: Send + Sync {
    /// Compact `ids` into a single new fileset that lives for `ttl`.
    async fn compact(
        &self,
        cancel: &CancellationToken,
        ids: Vec<FilesetId>,
        ttl: Duration,
    ) -> FilesetResult<FilesetId>;
}

/// Returns `true` if every adjacent pair of `layers` is compacted.
pub fn is_compacted(factor: i64, layers: &[Primitive]) -> bool {
    index_of_compacted(factor, layers) == layers.len()
}

/// Index of the last layer that is still compacted relative to everything
/// before it.
///
/// If the pair `(layers[i], layers[i + 1])` is the first to violate
/// `left >= right * factor`, this returns `i`, so a merge starting at `i`
/// restores the relationship. Returns `layers.len()` if no pair violates it.
pub fn index_of_compacted(factor: i64, layers: &[Primitive]) -> usize {
    layers
        .windows(2)
        .position(|pair| pair[0].size_bytes < pair[1].size_bytes.saturating_mul(factor))
        .unwrap_or(layers.len())
}

impl Storage {
    /// Returns `true` if the fileset is already in compacted form.
    ///
    /// A primitive is always compacted. A composite is compacted if the
    /// layers it resolves to are. Empty metadata has no answer and fails
    /// with [`FilesetError::EmptyFileset`].
    pub fn is_compacted(&self, id: &FilesetId) -> FilesetResult<bool> {
        match self.get(id)? {
            Metadata::Primitive(_) => Ok(true),
            Metadata::Composite(composite) => {
                let ids = self.flatten(&composite.points_to()?)?;
                let layers = self.get_primitive_batch(&ids)?;
                Ok(is_compacted(self.level_factor(), &layers))
            }
            Metadata::Empty => Err(FilesetError::EmptyFileset {
                op: "IsCompacted",
                id: *id,
            }),
        }
    }

    /// Sequential compaction, run on the calling thread.
    ///
    /// If `ids` already resolve to compacted layers, the result composes
    /// `ids` as given and no data is merged.
    pub fn compact_layers(
        &self,
        cancel: &CancellationToken,
        ids: &[FilesetId],
        ttl: Duration,
    ) -> FilesetResult<FilesetId> {
        let mut ids = ids.to_vec();
        loop {
            if cancel.is_cancelled() {
                return Err(FilesetError::Cancelled);
            }
            let flat = self.flatten(&ids)?;
            let layers = self.get_primitive_batch(&flat)?;
            let index = index_of_compacted(self.level_factor(), &layers);
            if index == layers.len() {
                return self.compose(&ids, ttl);
            }
            debug!(
                layers = layers.len(),
                index,
                merging = layers.len() - index,
                "merging layers to restore level factor"
            );
            let merged = self.merge(&flat[index..], ttl)?;
            let mut next = flat[..index].to_vec();
            next.push(merged);
            ids = next;
        }
    }
}

/// Runs [`Storage::compact_layers`] inline. Merging blocks on the store, so
/// callers on a runtime worker thread should move this onto
/// `tokio::task::spawn_blocking` or use a
/// [`DistributedCompactor`](crate::DistributedCompactor) over a
/// [`PooledWorker`](crate::PooledWorker).
#[async_trait]
impl Compactor for Storage {
    async fn compact(
        &self,
        cancel: &CancellationToken,
        ids: Vec<FilesetId>,
        ttl: Duration,
    ) -> FilesetResult<FilesetId> {
        self.compact_layers(cancel, &ids, ttl)
    }
}

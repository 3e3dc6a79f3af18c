//! Fan-in compaction across a [`CompactionWorker`].
//!
//! Inputs that fit within `max_fan_in` are sharded by path range, each shard
//! is merged by the worker, and the disjoint results are concatenated.
//! Larger inputs are split into contiguous groups, each group is compacted
//! recursively, and the group results are compacted in turn. Each step thus
//! handles at most `max_fan_in` references or one batch of shards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_types::FilesetId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::compaction::Compactor;
use crate::error::{FilesetError, FilesetResult};
use crate::storage::Storage;
use crate::worker::{CompactionTask, CompactionWorker};

/// Compacts by fanning tasks out to a worker while respecting `max_fan_in`.
pub struct DistributedCompactor {
    storage: Arc<Storage>,
    max_fan_in: usize,
    worker: Arc<dyn CompactionWorker>,
}

impl DistributedCompactor {
    /// Create a compactor. `max_fan_in` must be at least 2.
    pub fn new(
        storage: Arc<Storage>,
        max_fan_in: usize,
        worker: Arc<dyn CompactionWorker>,
    ) -> FilesetResult<Self> {
        if max_fan_in < 2 {
            return Err(FilesetError::Config(format!(
                "max_fan_in must be at least 2, got {max_fan_in}"
            )));
        }
        Ok(Self {
            storage,
            max_fan_in,
            worker,
        })
    }

    /// Create a compactor using the storage's configured `max_fan_in`.
    pub fn from_config(storage: Arc<Storage>, worker: Arc<dyn CompactionWorker>) -> FilesetResult<Self> {
        let max_fan_in = storage.config().max_fan_in;
        Self::new(storage, max_fan_in, worker)
    }

    pub fn max_fan_in(&self) -> usize {
        self.max_fan_in
    }

    /// Smallest power of `max_fan_in` that splits `len` inputs into at most
    /// `max_fan_in` groups.
    fn child_size(&self, len: usize) -> usize {
        let mut child_size = self.max_fan_in;
        while len.div_ceil(child_size) > self.max_fan_in {
            child_size *= self.max_fan_in;
        }
        child_size
    }

    async fn sharded_compact(
        &self,
        cancel: &CancellationToken,
        ids: Vec<FilesetId>,
        ttl: Duration,
    ) -> FilesetResult<FilesetId> {
        let mut tasks = Vec::new();
        self.storage.shard(&ids, |path_range| {
            tasks.push(CompactionTask {
                inputs: ids.clone(),
                path_range,
            });
            Ok(())
        })?;
        if cancel.is_cancelled() {
            return Err(FilesetError::Cancelled);
        }

        let expected = tasks.len();
        debug!(inputs = ids.len(), tasks = expected, "dispatching compaction batch");
        let results = self.worker.run(cancel, tasks).await?;
        if results.len() != expected {
            return Err(FilesetError::WorkerResultMismatch {
                expected,
                actual: results.len(),
            });
        }
        self.storage.concat(&results, ttl)
    }
}

#[async_trait]
impl Compactor for DistributedCompactor {
    async fn compact(
        &self,
        cancel: &CancellationToken,
        ids: Vec<FilesetId>,
        ttl: Duration,
    ) -> FilesetResult<FilesetId> {
        if cancel.is_cancelled() {
            return Err(FilesetError::Cancelled);
        }
        if ids.len() <= self.max_fan_in {
            return self.sharded_compact(cancel, ids, ttl).await;
        }

        let child_size = self.child_size(ids.len());
        debug!(
            inputs = ids.len(),
            child_size,
            groups = ids.len().div_ceil(child_size),
            "fanning in compaction"
        );
        let mut results = Vec::with_capacity(self.max_fan_in);
        for group in ids.chunks(child_size) {
            results.push(self.compact(cancel, group.to_vec(), ttl).await?);
        }
        self.compact(cancel, results, ttl).await
    }
}

impl std::fmt::Debug for DistributedCompactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedCompactor")
            .field("max_fan_in", &self.max_fan_in)
            .finish_non_exhaustive()
    }
}

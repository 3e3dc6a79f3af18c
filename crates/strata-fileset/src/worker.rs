//! Executors for compaction tasks.
//!
//! A [`CompactionWorker`] runs a batch of [`CompactionTask`]s and returns one
//! result per task, in task order, or fails the whole batch. Two executors
//! are provided and chosen at runtime:
//!
//! - [`LocalWorker`] runs each task immediately on the caller's task.
//! - [`PooledWorker`] defers tasks onto a queue drained by a pool of tokio
//!   tasks and waits for their replies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_types::{FilesetId, PathRange};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FilesetError, FilesetResult};
use crate::storage::Storage;

/// The smallest unit of compaction work.
///
/// Every task of a batch carries the full input list; `path_range` limits
/// which paths this task merges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionTask {
    pub inputs: Vec<FilesetId>,
    pub path_range: PathRange,
}

/// Executes batches of compaction tasks.
///
/// Implementations may run tasks concurrently, but must return results in
/// task order and must either return every result or fail.
#[async_trait]
pub trait CompactionWorker: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        tasks: Vec<CompactionTask>,
    ) -> FilesetResult<Vec<FilesetId>>;
}

// ---------------------------------------------------------------------------
// LocalWorker
// ---------------------------------------------------------------------------

/// Runs tasks one after another, in-process.
pub struct LocalWorker {
    storage: Arc<Storage>,
    ttl: Duration,
}

impl LocalWorker {
    /// Results live for the storage's configured default TTL.
    pub fn new(storage: Arc<Storage>) -> Self {
        let ttl = storage.config().default_ttl();
        Self { storage, ttl }
    }
}

#[async_trait]
impl CompactionWorker for LocalWorker {
    async fn run(
        &self,
        cancel: &CancellationToken,
        tasks: Vec<CompactionTask>,
    ) -> FilesetResult<Vec<FilesetId>> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in &tasks {
            if cancel.is_cancelled() {
                return Err(FilesetError::Cancelled);
            }
            results.push(
                self.storage
                    .merge_range(&task.inputs, &task.path_range, self.ttl)?,
            );
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// PooledWorker
// ---------------------------------------------------------------------------

struct Job {
    task: CompactionTask,
    reply: oneshot::Sender<FilesetResult<FilesetId>>,
}

/// Queues tasks for a fixed pool of background workers.
///
/// Must be created inside a tokio runtime. Dropping the pool, or calling
/// [`shutdown`](Self::shutdown), stops the workers once the queue drains.
pub struct PooledWorker {
    sender: mpsc::Sender<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl PooledWorker {
    /// Start `concurrency` workers merging against `storage`.
    pub fn spawn(storage: Arc<Storage>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let ttl = storage.config().default_ttl();
        let (sender, receiver) = mpsc::channel::<Job>(concurrency * 2);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..concurrency)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(Job { task, reply }) = job else {
                            break;
                        };
                        let storage = Arc::clone(&storage);
                        let result = tokio::task::spawn_blocking(move || {
                            storage.merge_range(&task.inputs, &task.path_range, ttl)
                        })
                        .await
                        .unwrap_or_else(|e| Err(FilesetError::Worker(e.to_string())));
                        // The batch may have been abandoned after cancellation.
                        let _ = reply.send(result);
                    }
                    debug!(worker_id, "compaction worker stopped");
                })
            })
            .collect();

        Self { sender, handles }
    }

    /// Number of background workers.
    pub fn concurrency(&self) -> usize {
        self.handles.len()
    }

    /// Close the queue and wait for every worker to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl CompactionWorker for PooledWorker {
    async fn run(
        &self,
        cancel: &CancellationToken,
        tasks: Vec<CompactionTask>,
    ) -> FilesetResult<Vec<FilesetId>> {
        let mut replies = Vec::with_capacity(tasks.len());
        for task in tasks {
            let (reply, receiver) = oneshot::channel();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FilesetError::Cancelled),
                sent = self.sender.send(Job { task, reply }) => {
                    sent.map_err(|_| FilesetError::Worker("worker pool is shut down".into()))?;
                }
            }
            replies.push(receiver);
        }

        let mut results = Vec::with_capacity(replies.len());
        for receiver in replies {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FilesetError::Cancelled),
                reply = receiver => {
                    reply.map_err(|_| FilesetError::Worker("worker dropped a task".into()))?
                }
            };
            results.push(result?);
        }
        Ok(results)
    }
}

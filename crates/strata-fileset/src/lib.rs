//! Fileset storage and leveled compaction for Strata.
//!
//! Filesets are immutable layers of path-indexed entries. Reads must consult
//! every layer a fileset resolves to, so layers are periodically merged to
//! keep their sizes geometrically decreasing: each layer at least
//! `level_factor` times larger than the next.
//!
//! # Components
//!
//! - [`Storage`] -- compose, merge, concat, and read filesets
//! - [`Storage::flatten`] -- resolve composites to their primitive layers
//! - [`Storage::is_compacted`] / [`index_of_compacted`] -- the level check
//! - [`Compactor`] -- sequential ([`Storage`]) or fan-in
//!   ([`DistributedCompactor`]) compaction
//! - [`Storage::shard`] -- split work into disjoint path ranges
//! - [`CompactionWorker`] -- batch executor, in-process ([`LocalWorker`]) or
//!   queued onto a task pool ([`PooledWorker`])
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use strata_fileset::{FilesetConfig, Storage};
//! use strata_store::{FileEntry, InMemoryMetadataStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(InMemoryMetadataStore::new());
//! let storage = Storage::new(store, FilesetConfig::default()).unwrap();
//! let ttl = Duration::from_secs(60);
//!
//! let big = storage.write(vec![FileEntry::new("/a", vec![0u8; 99])], ttl).unwrap();
//! let small = storage.write(vec![FileEntry::new("/b", vec![0u8; 49])], ttl).unwrap();
//!
//! let id = storage
//!     .compact_layers(&CancellationToken::new(), &[big, small], ttl)
//!     .unwrap();
//! assert!(storage.is_compacted(&id).unwrap());
//! assert_eq!(storage.flatten(&[id]).unwrap().len(), 1);
//! ```

pub mod compaction;
pub mod config;
pub mod distributed;
pub mod error;
mod resolver;
mod shard;
pub mod storage;
pub mod worker;

#[cfg(test)]
mod testing;

pub use compaction::{index_of_compacted, is_compacted, Compactor};
pub use config::FilesetConfig;
pub use distributed::DistributedCompactor;
pub use error::{FilesetError, FilesetResult};
pub use storage::Storage;
pub use worker::{CompactionTask, CompactionWorker, LocalWorker, PooledWorker};

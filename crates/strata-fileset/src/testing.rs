//! Helpers shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strata_store::{FileEntry, InMemoryMetadataStore, Metadata, MetadataStore, StoreResult};
use strata_types::FilesetId;

use crate::config::FilesetConfig;
use crate::storage::Storage;

pub const TTL: Duration = Duration::from_secs(60);

/// Store wrapper that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryMetadataStore,
    puts: AtomicUsize,
}

impl CountingStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl MetadataStore for CountingStore {
    fn get(&self, id: &FilesetId) -> StoreResult<Metadata> {
        self.inner.get(id)
    }

    fn put(&self, metadata: &Metadata, ttl: Duration) -> StoreResult<FilesetId> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(metadata, ttl)
    }

    fn exists(&self, id: &FilesetId) -> StoreResult<bool> {
        self.inner.exists(id)
    }
}

pub fn storage_with(config: FilesetConfig) -> (Arc<Storage>, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    let storage = Storage::new(store.clone(), config).unwrap();
    (Arc::new(storage), store)
}

pub fn storage(level_factor: i64) -> Arc<Storage> {
    storage_with(FilesetConfig {
        level_factor,
        ..Default::default()
    })
    .0
}

/// Write a single-entry layer of exactly `size` bytes at path `/{tag}`.
pub fn layer(storage: &Storage, tag: &str, size: i64) -> FilesetId {
    let path = format!("/{tag}");
    let data = vec![b'x'; (size as usize).saturating_sub(path.len())];
    storage.write(vec![FileEntry::new(path, data)], TTL).unwrap()
}

/// Write one layer per size, tagged by position.
pub fn layers(storage: &Storage, sizes: &[i64]) -> Vec<FilesetId> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| layer(storage, &i.to_string(), *size))
        .collect()
}

pub fn sizes_of(storage: &Storage, id: &FilesetId) -> Vec<i64> {
    let flat = storage.flatten(&[*id]).unwrap();
    storage
        .get_primitive_batch(&flat)
        .unwrap()
        .iter()
        .map(|p| p.size_bytes)
        .collect()
}

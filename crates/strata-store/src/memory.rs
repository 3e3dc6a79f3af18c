use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use strata_types::FilesetId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::metadata::Metadata;
use crate::traits::MetadataStore;

struct StoredEntry {
    metadata: Metadata,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

fn deadline(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

fn later(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}

/// In-memory, HashMap-based metadata store.
///
/// Intended for tests and embedding. Entries live behind a `RwLock` and are
/// cloned on read. Expiry is recorded but never enforced here.
pub struct InMemoryMetadataStore {
    entries: RwLock<HashMap<FilesetId, StoredEntry>>,
}

impl InMemoryMetadataStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of filesets currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// When the metadata for `id` expires. `Ok(None)` means it never does.
    pub fn expires_at(&self, id: &FilesetId) -> StoreResult<Option<Instant>> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(id)
            .map(|entry| entry.expires_at)
            .ok_or(StoreError::NotFound(*id))
    }

    /// Return a sorted list of all stored ids.
    pub fn all_ids(&self) -> Vec<FilesetId> {
        let map = self.entries.read().expect("lock poisoned");
        let mut ids: Vec<FilesetId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, id: &FilesetId) -> StoreResult<Metadata> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(id)
            .map(|entry| entry.metadata.clone())
            .ok_or(StoreError::NotFound(*id))
    }

    fn put(&self, metadata: &Metadata, ttl: Duration) -> StoreResult<FilesetId> {
        let id = metadata.compute_id()?;
        let expires_at = deadline(ttl);
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get_mut(&id) {
            Some(existing) => existing.expires_at = later(existing.expires_at, expires_at),
            None => {
                debug!(id = %id.short_hex(), kind = metadata.kind(), "stored fileset metadata");
                map.insert(
                    id,
                    StoredEntry {
                        metadata: metadata.clone(),
                        expires_at,
                    },
                );
            }
        }
        Ok(id)
    }

    fn exists(&self, id: &FilesetId) -> StoreResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetadataStore")
            .field("fileset_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Composite, FileEntry, Primitive};

    const TTL: Duration = Duration::from_secs(60);

    fn primitive(path: &str, data: &[u8]) -> Metadata {
        Metadata::Primitive(Primitive::new(vec![FileEntry::new(path, data.to_vec())]))
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryMetadataStore::new();
        let md = primitive("/a", b"hello");
        let id = store.put(&md, TTL).unwrap();
        assert_eq!(store.get(&id).unwrap(), md);
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryMetadataStore::new();
        let id = FilesetId::from_hash([9; 32]);
        assert!(matches!(store.get(&id), Err(StoreError::NotFound(missing)) if missing == id));
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryMetadataStore::new();
        let md = primitive("/a", b"same");
        let id1 = store.put(&md, TTL).unwrap();
        let id2 = store.put(&md, TTL).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rewrite_keeps_later_expiry() {
        let store = InMemoryMetadataStore::new();
        let md = primitive("/a", b"x");
        let id = store.put(&md, Duration::from_secs(3600)).unwrap();
        let long = store.expires_at(&id).unwrap();
        assert!(long.is_some());
        store.put(&md, Duration::from_secs(1)).unwrap();
        assert_eq!(store.expires_at(&id).unwrap(), long);
    }

    #[test]
    fn unbounded_ttl_never_expires() {
        let store = InMemoryMetadataStore::new();
        let md = primitive("/a", b"forever");
        let id = store.put(&md, Duration::MAX).unwrap();
        assert_eq!(store.expires_at(&id).unwrap(), None);

        // A shorter rewrite does not bring the expiry back.
        store.put(&md, Duration::from_secs(1)).unwrap();
        assert_eq!(store.expires_at(&id).unwrap(), None);
    }

    #[test]
    fn unbounded_rewrite_extends_bounded_entry() {
        let store = InMemoryMetadataStore::new();
        let md = primitive("/a", b"x");
        let id = store.put(&md, TTL).unwrap();
        store.put(&md, Duration::MAX).unwrap();
        assert_eq!(store.expires_at(&id).unwrap(), None);
    }

    #[test]
    fn expiry_of_missing_is_not_found() {
        let store = InMemoryMetadataStore::new();
        assert!(store.expires_at(&FilesetId::from_hash([4; 32])).is_err());
    }

    #[test]
    fn stores_every_variant() {
        let store = InMemoryMetadataStore::new();
        let prim = store.put(&primitive("/a", b"1"), TTL).unwrap();
        let comp = store
            .put(&Metadata::Composite(Composite::new(&[prim])), TTL)
            .unwrap();
        let empty = store.put(&Metadata::Empty, TTL).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&empty).unwrap(), Metadata::Empty);
        assert_eq!(store.all_ids().len(), 3);
        assert!(store.all_ids().windows(2).all(|w| w[0] <= w[1]));
        assert!(matches!(store.get(&comp).unwrap(), Metadata::Composite(_)));
    }

    #[test]
    fn get_batch_fails_on_missing() {
        let store = InMemoryMetadataStore::new();
        let id = store.put(&primitive("/a", b"1"), TTL).unwrap();
        assert_eq!(store.get_batch(&[id]).unwrap().len(), 1);
        assert!(store
            .get_batch(&[id, FilesetId::from_hash([3; 32])])
            .is_err());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryMetadataStore::new());
        let id = store.put(&primitive("/shared", b"data"), TTL).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let md = store.get(&id).unwrap();
                    assert_eq!(md.compute_id().unwrap(), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryMetadataStore::default();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryMetadataStore"));
        assert!(debug.contains("fileset_count"));
    }
}

//! The [`Storage`] handle and the data-combining capabilities compaction
//! is built from: compose, merge, concat, and read.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use strata_store::{Composite, FileEntry, Metadata, MetadataStore, Primitive};
use strata_types::{FilesetId, PathRange};
use tracing::debug;

use crate::config::FilesetConfig;
use crate::error::{FilesetError, FilesetResult};

/// Fileset storage over a metadata store.
///
/// Every operation that produces data writes a new fileset and returns its
/// id. Inputs are never modified.
pub struct Storage {
    store: Arc<dyn MetadataStore>,
    config: FilesetConfig,
}

impl Storage {
    /// Create storage over `store`, rejecting invalid configuration.
    pub fn new(store: Arc<dyn MetadataStore>, config: FilesetConfig) -> FilesetResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &FilesetConfig {
        &self.config
    }

    pub fn level_factor(&self) -> i64 {
        self.config.level_factor
    }

    /// Read the metadata for `id`.
    pub fn get(&self, id: &FilesetId) -> FilesetResult<Metadata> {
        Ok(self.store.get(id)?)
    }

    pub(crate) fn get_primitive(&self, id: &FilesetId) -> FilesetResult<Primitive> {
        match self.get(id)? {
            Metadata::Primitive(primitive) => Ok(primitive),
            other => Err(FilesetError::NotPrimitive {
                id: *id,
                kind: other.kind(),
            }),
        }
    }

    pub(crate) fn get_primitive_batch(&self, ids: &[FilesetId]) -> FilesetResult<Vec<Primitive>> {
        ids.iter().map(|id| self.get_primitive(id)).collect()
    }

    /// Write a new primitive layer from `entries`.
    pub fn write(&self, entries: Vec<FileEntry>, ttl: Duration) -> FilesetResult<FilesetId> {
        self.put_primitive(Primitive::new(entries), ttl)
    }

    fn put_primitive(&self, primitive: Primitive, ttl: Duration) -> FilesetResult<FilesetId> {
        Ok(self.store.put(&Metadata::Primitive(primitive), ttl)?)
    }

    /// Create a composite pointing at `ids`. No data is moved.
    pub fn compose(&self, ids: &[FilesetId], ttl: Duration) -> FilesetResult<FilesetId> {
        let id = self.store.put(&Metadata::Composite(Composite::new(ids)), ttl)?;
        debug!(layers = ids.len(), id = %id.short_hex(), "composed fileset");
        Ok(id)
    }

    /// Combine the content of `ids` into one new primitive.
    ///
    /// When several layers hold the same path, the later layer wins.
    pub fn merge(&self, ids: &[FilesetId], ttl: Duration) -> FilesetResult<FilesetId> {
        self.merge_range(ids, &PathRange::full(), ttl)
    }

    /// Like [`merge`](Self::merge), keeping only paths inside `range`.
    pub fn merge_range(
        &self,
        ids: &[FilesetId],
        range: &PathRange,
        ttl: Duration,
    ) -> FilesetResult<FilesetId> {
        let merged = self.merged_entries(ids, range)?;
        let primitive = Primitive::new(merged);
        let size_bytes = primitive.size_bytes;
        let id = self.put_primitive(primitive, ttl)?;
        debug!(inputs = ids.len(), %range, size_bytes, id = %id.short_hex(), "merged layers");
        Ok(id)
    }

    /// Join layers whose paths are already sorted and disjoint, in order.
    ///
    /// Nothing is re-sorted; inputs that overlap fail with
    /// [`FilesetError::UnsortedConcat`].
    pub fn concat(&self, ids: &[FilesetId], ttl: Duration) -> FilesetResult<FilesetId> {
        let flat = self.flatten(ids)?;
        let mut entries: Vec<FileEntry> = Vec::new();
        let mut size_bytes = 0;
        for primitive in self.get_primitive_batch(&flat)? {
            if let (Some(previous), Some((next, _))) = (entries.last(), primitive.key_bounds()) {
                if previous.path.as_str() >= next {
                    return Err(FilesetError::UnsortedConcat {
                        previous: previous.path.clone(),
                        next: next.to_string(),
                    });
                }
            }
            size_bytes += primitive.size_bytes;
            entries.extend(primitive.entries);
        }
        let id = self.put_primitive(
            Primitive {
                size_bytes,
                entries,
            },
            ttl,
        )?;
        debug!(inputs = flat.len(), id = %id.short_hex(), "concatenated layers");
        Ok(id)
    }

    /// The visible content of a fileset: every path once, newest data.
    pub fn read(&self, id: &FilesetId) -> FilesetResult<Vec<FileEntry>> {
        self.merged_entries(&[*id], &PathRange::full())
    }

    fn merged_entries(&self, ids: &[FilesetId], range: &PathRange) -> FilesetResult<Vec<FileEntry>> {
        let flat = self.flatten(ids)?;
        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for primitive in self.get_primitive_batch(&flat)? {
            for entry in primitive.entries {
                if range.contains(&entry.path) {
                    merged.insert(entry.path, entry.data);
                }
            }
        }
        Ok(merged
            .into_iter()
            .map(|(path, data)| FileEntry { path, data })
            .collect())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

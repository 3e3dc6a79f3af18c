use strata_store::StoreError;
use strata_types::FilesetId;

/// Errors from fileset storage and compaction.
#[derive(Debug, thiserror::Error)]
pub enum FilesetError {
    /// Lookup or decoding failure from the metadata store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The operation has no meaning for a fileset with empty metadata.
    #[error("{op} is not defined for empty filesets ({id})")]
    EmptyFileset { op: &'static str, id: FilesetId },

    /// A primitive layer was required but something else was stored.
    #[error("fileset {id} is a {kind}, expected a primitive")]
    NotPrimitive { id: FilesetId, kind: &'static str },

    /// A compaction worker returned the wrong number of results.
    #[error("worker returned {actual} results for {expected} tasks")]
    WorkerResultMismatch { expected: usize, actual: usize },

    /// Concat inputs were not sorted and key-disjoint.
    #[error("concat inputs overlap: {previous:?} is not before {next:?}")]
    UnsortedConcat { previous: String, next: String },

    /// A compaction worker failed outside of storage.
    #[error("worker error: {0}")]
    Worker(String),

    /// Configuration is invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller cancelled the operation.
    #[error("compaction cancelled")]
    Cancelled,
}

impl FilesetError {
    /// Returns `true` if this error only reports cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result alias for fileset operations.
pub type FilesetResult<T> = Result<T, FilesetError>;

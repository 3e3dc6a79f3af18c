use strata_types::FilesetId;

/// Errors from metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested fileset was not found.
    #[error("fileset not found: {0}")]
    NotFound(FilesetId),

    /// A composite's pointer list could not be decoded.
    #[error("malformed composite layer {index}: {reason}")]
    MalformedComposite { index: usize, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

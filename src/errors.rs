use std::io;

use thiserror::Error;

/// Error type for the mirror pipeline: source access, partitioning,
/// storage, and bulk transfer failures.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("could not obtain last-modified metadata for '{repo_id}': {reason}")]
    MetadataUnavailable { repo_id: String, reason: String },
    #[error("could not fetch rows for '{repo_id}': {reason}")]
    RowsUnavailable { repo_id: String, reason: String },
    #[error("cannot derive a partition key from date value '{value}'")]
    MalformedDate { value: String },
    #[error("object store failure on key '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("partition encoding failed: {0}")]
    Encode(String),
    #[error("bulk transfer exited with status {status}")]
    TransferFailure {
        status: i32,
        stdout: String,
        stderr: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MirrorError {
    /// Wraps an object-store error against the key it was issued for.
    pub fn storage(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        MirrorError::Storage {
            key: key.into(),
            source: Box::new(source),
        }
    }
}

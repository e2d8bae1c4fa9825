//! Storage error types for grml-storage.

use grml_core::error::CoreError;
use thiserror::Error;

/// Errors produced by document store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be rebuilt into a model graph.
    #[error(transparent)]
    Model(#[from] CoreError),

    #[error("document not found: {id}")]
    DocumentNotFound { id: String },

    /// Document ids become file names, so only a safe subset is allowed.
    #[error("invalid document id: '{id}'")]
    InvalidDocumentId { id: String },
}

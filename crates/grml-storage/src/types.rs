//! Storage-layer types for document identity and metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Name of a stored model document.
///
/// Ids are used as file names by the file backend: non-empty, at most 128
/// characters of ASCII letters, digits, `-`, `_` and `.`, not starting with
/// a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, StorageError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= 128
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(DocumentId(id))
        } else {
            Err(StorageError::InvalidDocumentId { id })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DocumentId::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Summary of a stored document (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    /// Name of the stored root model.
    pub name: String,
    /// Hex-encoded content hash.
    pub hash: String,
}

/// Result of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The stored content hash already matched; nothing was written.
    Unchanged,
}

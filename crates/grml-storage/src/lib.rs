//! Document storage for serialized GrML models.
//!
//! Provides the [`DocumentStore`] trait plus the [`InMemoryStore`] and
//! [`FileStore`] backends. Both skip writes whose blake3 content hash
//! matches what is already stored.

pub mod error;
pub mod file;
pub mod hash;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use file::FileStore;
pub use hash::{canonical_bytes, hash_model};
pub use memory::InMemoryStore;
pub use traits::DocumentStore;
pub use types::{DocumentId, DocumentSummary, SaveOutcome};

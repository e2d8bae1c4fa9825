//! Deterministic content hashing for serialized models using blake3.
//!
//! The hash covers the compact JSON encoding of a [`ModelSerialization`].
//! The encoding is deterministic: the serialization uses `Vec` and
//! `IndexMap` only, so the same model always produces the same bytes.
//! Hashes are derived state, recomputed from stored content when needed.

use grml_core::serialize::ModelSerialization;

use crate::error::StorageError;

/// The bytes a model is hashed over.
pub fn canonical_bytes(model: &ModelSerialization) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(model)?)
}

pub fn hash_model(model: &ModelSerialization) -> Result<blake3::Hash, StorageError> {
    Ok(blake3::hash(&canonical_bytes(model)?))
}

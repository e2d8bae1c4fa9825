//! In-memory implementation of [`DocumentStore`].
//!
//! Keeps the canonical JSON of every document with its hash. Used in tests
//! and anywhere persistence isn't needed.

use std::collections::BTreeMap;

use grml_core::serialize::ModelSerialization;

use crate::error::StorageError;
use crate::hash::canonical_bytes;
use crate::traits::DocumentStore;
use crate::types::{DocumentId, DocumentSummary, SaveOutcome};

#[derive(Debug, Clone)]
struct StoredDocument {
    name: String,
    bytes: Vec<u8>,
    hash: blake3::Hash,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: BTreeMap<DocumentId, StoredDocument>,
    writes: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves that actually stored content.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DocumentStore for InMemoryStore {
    fn save(&mut self, id: &DocumentId, model: &ModelSerialization) -> Result<SaveOutcome, StorageError> {
        let bytes = canonical_bytes(model)?;
        let hash = blake3::hash(&bytes);
        if self.documents.get(id).map(|d| d.hash) == Some(hash) {
            tracing::debug!(%id, "document unchanged, skipping write");
            return Ok(SaveOutcome::Unchanged);
        }
        self.documents.insert(
            id.clone(),
            StoredDocument {
                name: model.name.clone(),
                bytes,
                hash,
            },
        );
        self.writes += 1;
        tracing::debug!(%id, hash = %hash.to_hex(), "document stored");
        Ok(SaveOutcome::Written)
    }

    fn load(&self, id: &DocumentId) -> Result<ModelSerialization, StorageError> {
        let doc = self
            .documents
            .get(id)
            .ok_or_else(|| StorageError::DocumentNotFound { id: id.to_string() })?;
        Ok(serde_json::from_slice(&doc.bytes)?)
    }

    fn delete(&mut self, id: &DocumentId) -> Result<(), StorageError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::DocumentNotFound { id: id.to_string() })
    }

    fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        Ok(self
            .documents
            .iter()
            .map(|(id, doc)| DocumentSummary {
                id: id.clone(),
                name: doc.name.clone(),
                hash: doc.hash.to_hex().to_string(),
            })
            .collect())
    }

    fn hash(&self, id: &DocumentId) -> Result<Option<blake3::Hash>, StorageError> {
        Ok(self.documents.get(id).map(|d| d.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grml_core::builtin::{COMPOSITE_NN, PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::graph::ModelGraph;
    use grml_core::registry::Registry;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[test]
    fn unchanged_saves_are_skipped() {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let mut store = InMemoryStore::new();

        assert_eq!(store.save_graph(&id("p"), &graph).unwrap(), SaveOutcome::Written);
        assert_eq!(store.save_graph(&id("p"), &graph).unwrap(), SaveOutcome::Unchanged);
        assert_eq!(store.writes(), 1);

        let root = graph.root();
        graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        assert_eq!(store.save_graph(&id("p"), &graph).unwrap(), SaveOutcome::Written);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn graphs_survive_storage() {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let root = graph.root();
        let nn = graph.add_function(&registry, COMPOSITE_NN, root).unwrap();
        let mut store = InMemoryStore::new();
        store.save_graph(&id("nn"), &graph).unwrap();

        let loaded = store.load_graph(&registry, &id("nn")).unwrap();
        assert!(loaded.contains_function(nn));
        assert_eq!(loaded.serialize().unwrap(), graph.serialize().unwrap());
    }

    #[test]
    fn listing_and_deleting() {
        let registry = Registry::with_builtins();
        let graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let mut store = InMemoryStore::new();
        store.save_graph(&id("b"), &graph).unwrap();
        store.save_graph(&id("a"), &graph).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, id("a"));
        assert_eq!(listed[0].hash, listed[1].hash);
        assert_eq!(listed[0].name, "Unnamed Pipeline");

        store.delete(&id("a")).unwrap();
        assert!(!store.contains(&id("a")).unwrap());
        assert!(matches!(
            store.delete(&id("a")),
            Err(StorageError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            store.load(&id("a")),
            Err(StorageError::DocumentNotFound { .. })
        ));
    }
}

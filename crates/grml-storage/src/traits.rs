//! The [`DocumentStore`] trait defining the storage contract for models.
//!
//! Backends store one serialized model per [`DocumentId`]. Saves compare
//! content hashes first, so saving an unchanged model writes nothing.

use grml_core::graph::ModelGraph;
use grml_core::registry::Registry;
use grml_core::serialize::ModelSerialization;

use crate::error::StorageError;
use crate::types::{DocumentId, DocumentSummary, SaveOutcome};

pub trait DocumentStore {
    /// Stores `model` under `id`, unless the stored content hash already
    /// matches.
    fn save(&mut self, id: &DocumentId, model: &ModelSerialization) -> Result<SaveOutcome, StorageError>;

    fn load(&self, id: &DocumentId) -> Result<ModelSerialization, StorageError>;

    fn delete(&mut self, id: &DocumentId) -> Result<(), StorageError>;

    /// All stored documents, ordered by id.
    fn list(&self) -> Result<Vec<DocumentSummary>, StorageError>;

    /// Content hash of the stored document, `None` if there is none.
    fn hash(&self, id: &DocumentId) -> Result<Option<blake3::Hash>, StorageError>;

    fn contains(&self, id: &DocumentId) -> Result<bool, StorageError> {
        Ok(self.hash(id)?.is_some())
    }

    /// Loads a document and rebuilds its graph, connections included.
    fn load_graph(&self, registry: &Registry, id: &DocumentId) -> Result<ModelGraph, StorageError> {
        let model = self.load(id)?;
        Ok(ModelGraph::load(registry, &model)?)
    }

    fn save_graph(&mut self, id: &DocumentId, graph: &ModelGraph) -> Result<SaveOutcome, StorageError> {
        let model = graph.serialize()?;
        self.save(id, &model)
    }
}

//! The model path shown above the editors.

use grml_core::graph::ModelGraph;
use grml_core::id::ModelId;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    path: Vec<ModelId>,
}

impl Breadcrumb {
    pub fn new(root: ModelId) -> Self {
        Breadcrumb { path: vec![root] }
    }

    pub fn path(&self) -> &[ModelId] {
        &self.path
    }

    /// The innermost model, which is the one being edited.
    pub fn current(&self) -> ModelId {
        self.path[self.path.len() - 1]
    }

    pub fn set(&mut self, path: Vec<ModelId>) {
        if !path.is_empty() {
            self.path = path;
        }
    }

    pub fn reset(&mut self, root: ModelId) {
        self.path = vec![root];
    }

    /// Model names along the path, root first.
    pub fn labels(&self, graph: &ModelGraph) -> Result<Vec<String>, AppError> {
        self.path
            .iter()
            .map(|id| Ok(graph.model(*id)?.name.clone()))
            .collect()
    }
}

//! Models: ordered containers of functions with a variable namespace.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{FunctionId, ModelId};
use crate::types::DataType;

/// An entry of a model's variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "type")]
    pub data_type: DataType,
}

/// A pipeline, composite network or text pipeline.
#[derive(Debug, Clone)]
pub struct Model {
    pub id: ModelId,
    /// Registry name of the model kind.
    pub kind: String,
    pub name: String,
    /// Child functions in insertion order.
    pub children: Vec<FunctionId>,
    /// The model function owning this model; `None` for the root.
    pub parent: Option<FunctionId>,
    pub(crate) layer_root: Option<String>,
    pub(crate) variables: IndexMap<String, Variable>,
}

impl Model {
    pub(crate) fn new(id: ModelId, kind: &str, name: &str, parent: Option<FunctionId>) -> Self {
        Model {
            id,
            kind: kind.to_string(),
            name: name.to_string(),
            children: Vec::new(),
            parent,
            layer_root: None,
            variables: IndexMap::new(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn contains(&self, function: FunctionId) -> bool {
        self.children.contains(&function)
    }

    /// Function kind the layer walk starts from, for layered models.
    pub fn layer_root(&self) -> Option<&str> {
        self.layer_root.as_deref()
    }
}

//! Wire format of models and functions.
//!
//! The JSON shape is shared with every peer holding a copy of the model, so
//! keys are camelCase and ids are bare UUID strings. Loading happens in two
//! phases: [`ModelGraph::deserialize`] rebuilds functions and nested models
//! with their ids and names, then the caller resolves the descriptors from
//! [`connection_descriptors`] through [`ModelGraph::resolve`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::{ConnectionDescriptor, ConnectionRequest};
use crate::error::CoreError;
use crate::graph::ModelGraph;
use crate::id::{FunctionId, ModelId, PortId};
use crate::port::{Port, PortKind};
use crate::property::PropertyPatch;
use crate::registry::Registry;
use crate::types::DataType;

/// Serialized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSerialization {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub children: Vec<FunctionSerialization>,
    /// Id of the model function holding this model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FunctionId>,
}

/// Serialized port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSerialization {
    pub name: String,
    pub uuid: PortId,
    /// Older clients send the name here; it wins over `name` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,
}

impl PortSerialization {
    fn from_port(port: &Port) -> Self {
        PortSerialization {
            name: port.name.clone(),
            uuid: port.id,
            port_name: None,
        }
    }

    pub fn effective_name(&self) -> &str {
        self.port_name.as_deref().unwrap_or(&self.name)
    }
}

/// Incoming connections of one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSerialization {
    #[serde(default)]
    pub data: Vec<SourceEntry>,
}

/// The origin of one incoming connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub start_func: Option<FunctionId>,
    pub start_func_return_index: Option<usize>,
}

/// Block position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSerialization {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub inputs: Vec<PortSerialization>,
    #[serde(default)]
    pub outputs: Vec<PortSerialization>,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSerialization {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<String>,
}

/// Per-kind representation state, keyed `BLOCK` / `CODE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentationSerialization {
    #[serde(rename = "BLOCK", default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockSerialization>,
    #[serde(rename = "CODE", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeSerialization>,
}

/// Serialized function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSerialization {
    pub original_name: String,
    pub name: String,
    pub uuid: FunctionId,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default)]
    pub parameters: Vec<PortSerialization>,
    #[serde(default)]
    pub return_values: Vec<PortSerialization>,
    #[serde(default)]
    pub representation: RepresentationSerialization,
    #[serde(default)]
    pub sources: Vec<SourceSerialization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_function_id: Option<FunctionId>,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Box<ModelSerialization>>,
}

// ----------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------

impl ModelGraph {
    /// Serializes the root model.
    pub fn serialize(&self) -> Result<ModelSerialization, CoreError> {
        self.serialize_model(self.root())
    }

    pub fn serialize_model(&self, id: ModelId) -> Result<ModelSerialization, CoreError> {
        let model = self.model(id)?;
        let children = model
            .children
            .iter()
            .map(|f| self.serialize_function(*f))
            .collect::<Result<_, _>>()?;
        Ok(ModelSerialization {
            name: model.name.clone(),
            kind: model.kind.clone(),
            children,
            parent_id: model.parent,
        })
    }

    pub fn serialize_function(&self, id: FunctionId) -> Result<FunctionSerialization, CoreError> {
        let f = self.function(id)?;
        let inputs: Vec<PortSerialization> =
            f.parameters.iter().map(PortSerialization::from_port).collect();
        let outputs: Vec<PortSerialization> =
            f.return_values.iter().map(PortSerialization::from_port).collect();

        let representation = RepresentationSerialization {
            block: f.block().map(|b| BlockSerialization {
                kind: f.kind.clone(),
                name: f.title.clone(),
                protected: b.protected,
                locked: b.locked,
                inputs: inputs.clone(),
                outputs: outputs.clone(),
                position: Position { x: b.x, y: b.y },
            }),
            code: f.code_state().map(|c| CodeSerialization {
                kind: f.title.clone(),
                content: c.content(),
            }),
        };

        let mut sources = Vec::with_capacity(f.parameters.len());
        for param in &f.parameters {
            let mut data = Vec::with_capacity(param.connections().len());
            for c in param.connections() {
                let start = self.connection(*c)?.start;
                let index = self
                    .function(start.function)?
                    .port_index(start.port)
                    .map(|(_, i)| i);
                data.push(SourceEntry {
                    start_func: Some(start.function),
                    start_func_return_index: index,
                });
            }
            sources.push(SourceSerialization { data });
        }

        let model = match f.submodel {
            Some(sub) => Some(Box::new(self.serialize_model(sub)?)),
            None => None,
        };

        Ok(FunctionSerialization {
            original_name: f.kind.clone(),
            name: f.title.clone(),
            uuid: f.id,
            properties: f.properties.values(),
            parameters: inputs,
            return_values: outputs,
            representation,
            sources,
            parent_function_id: self.model(f.model)?.parent,
            code: f.code().to_string(),
            model,
        })
    }

    // ------------------------------------------------------------------
    // Deserialization
    // ------------------------------------------------------------------

    /// Phase one of loading: rebuilds models and functions, without
    /// connections.
    pub fn deserialize(registry: &Registry, s: &ModelSerialization) -> Result<Self, CoreError> {
        let mut graph = ModelGraph::blank();
        let root = graph.create_model(registry, &s.kind, None, false)?;
        graph.set_root(root);
        graph.fill_model(registry, root, s)?;
        Ok(graph)
    }

    /// Both loading phases.
    pub fn load(registry: &Registry, s: &ModelSerialization) -> Result<Self, CoreError> {
        let mut graph = Self::deserialize(registry, s)?;
        for descriptor in connection_descriptors(&graph, s)? {
            graph.resolve(ConnectionRequest::Serialized(descriptor))?;
        }
        Ok(graph)
    }

    fn fill_model(
        &mut self,
        registry: &Registry,
        model: ModelId,
        s: &ModelSerialization,
    ) -> Result<(), CoreError> {
        self.model_mut(model)?.name = s.name.clone();
        for child in &s.children {
            self.insert_serialized(registry, model, child)?;
        }
        Ok(())
    }

    /// Phase one for a single function: builds it inside `model` with the
    /// serialized ids, names, properties, block state and code.
    pub fn insert_serialized(
        &mut self,
        registry: &Registry,
        model: ModelId,
        s: &FunctionSerialization,
    ) -> Result<FunctionId, CoreError> {
        let id = self.insert_function(registry, &s.original_name, model, s.uuid, false)?;

        let submodel = self.function(id)?.submodel;
        if let Some(sub) = submodel {
            match &s.model {
                Some(nested) => self.fill_model(registry, sub, nested)?,
                None => {
                    return Err(CoreError::MalformedSerialization {
                        reason: format!("model function {} has no model", id),
                    })
                }
            }
        }
        self.sync_ports(id)?;

        let old_names: Vec<String> = self
            .function(id)?
            .return_values
            .iter()
            .map(|r| r.name.clone())
            .collect();
        self.apply_ports(id, PortKind::Parameter, &s.parameters, true)?;
        self.apply_ports(id, PortKind::ReturnValue, &s.return_values, true)?;
        for name in old_names {
            self.remove_variable(model, &name)?;
        }
        self.register_return_values(id)?;

        self.apply_common(id, s)?;
        if let Some(block) = &s.representation.block {
            if let Some(state) = self.function_mut(id)?.block_mut() {
                state.x = block.position.x;
                state.y = block.position.y;
                state.protected = block.protected;
                state.locked = block.locked;
            }
        }
        Ok(id)
    }

    /// Applies a serialized function to an existing one: port names,
    /// properties and code. Ids are kept, so live connections survive.
    pub fn apply_serialized(
        &mut self,
        id: FunctionId,
        s: &FunctionSerialization,
    ) -> Result<(), CoreError> {
        let model = self.function(id)?.model;
        let old_names: Vec<String> = self
            .function(id)?
            .return_values
            .iter()
            .map(|r| r.name.clone())
            .collect();
        self.apply_ports(id, PortKind::Parameter, &s.parameters, false)?;
        self.apply_ports(id, PortKind::ReturnValue, &s.return_values, false)?;
        for name in old_names {
            self.remove_variable(model, &name)?;
        }
        self.register_return_values(id)?;
        self.apply_common(id, s)
    }

    /// Title, property values and non-empty code.
    fn apply_common(&mut self, id: FunctionId, s: &FunctionSerialization) -> Result<(), CoreError> {
        if !s.name.is_empty() {
            self.function_mut(id)?.title = s.name.clone();
        }
        for (key, value) in &s.properties {
            let patch = PropertyPatch::new(key, value.clone());
            match self.set_property(id, &patch) {
                Ok(_) | Err(CoreError::UnknownProperty { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !s.code.is_empty() {
            self.set_code(id, &s.code)?;
        }
        Ok(())
    }

    /// Overwrites port names, and with `with_ids` port ids, by index.
    fn apply_ports(
        &mut self,
        id: FunctionId,
        kind: PortKind,
        serialized: &[PortSerialization],
        with_ids: bool,
    ) -> Result<(), CoreError> {
        let f = self.function_mut(id)?;
        let synced = f.port_sync.is_some();
        let ports = f.ports_mut(kind);
        if serialized.len() > ports.len() {
            if !synced {
                return Err(CoreError::PortCountMismatch {
                    function: id,
                    kind,
                    expected: ports.len(),
                    actual: serialized.len(),
                });
            }
            while ports.len() < serialized.len() {
                ports.push(Port::new(kind, id, "", DataType::None));
            }
        }
        for (port, s) in ports.iter_mut().zip(serialized) {
            if with_ids {
                port.id = s.uuid;
            }
            port.name = s.effective_name().to_string();
        }
        Ok(())
    }

    fn register_return_values(&mut self, id: FunctionId) -> Result<(), CoreError> {
        let f = self.function(id)?;
        let model = f.model;
        let variables: Vec<(String, DataType)> = f
            .return_values
            .iter()
            .map(|r| (r.name.clone(), r.data_type.clone()))
            .collect();
        for (name, data_type) in variables {
            self.add_variable(model, &name, data_type)?;
        }
        Ok(())
    }

    /// The model a serialized function belongs in: the submodel of its
    /// `parentFunctionId` when this graph has that function, else
    /// `fallback`.
    pub fn target_model(&self, s: &FunctionSerialization, fallback: ModelId) -> ModelId {
        s.parent_function_id
            .and_then(|owner| self.function(owner).ok())
            .and_then(|f| f.submodel)
            .unwrap_or(fallback)
    }
}

/// Phase two of loading: the connections recorded in the `sources` tables
/// of a serialized model, including nested models.
pub fn connection_descriptors(
    graph: &ModelGraph,
    s: &ModelSerialization,
) -> Result<Vec<ConnectionDescriptor>, CoreError> {
    let mut out = Vec::new();
    for child in &s.children {
        out.extend(function_connection_descriptors(graph, child)?);
        if let Some(nested) = &child.model {
            out.extend(connection_descriptors(graph, nested)?);
        }
    }
    Ok(out)
}

/// Incoming connections of one serialized function. Entries without a
/// start function are skipped.
pub fn function_connection_descriptors(
    graph: &ModelGraph,
    s: &FunctionSerialization,
) -> Result<Vec<ConnectionDescriptor>, CoreError> {
    let mut out = Vec::new();
    for (index, source) in s.sources.iter().enumerate() {
        let Some(param) = s.parameters.get(index) else {
            return Err(CoreError::MalformedSerialization {
                reason: format!("function {} has sources for missing parameter {}", s.uuid, index),
            });
        };
        for entry in &source.data {
            let (Some(start_func), Some(ret_index)) = (entry.start_func, entry.start_func_return_index)
            else {
                continue;
            };
            let start = graph
                .function(start_func)?
                .port_ref(PortKind::ReturnValue, ret_index)?;
            out.push(ConnectionDescriptor {
                param_func_id: s.uuid,
                param_id: param.uuid,
                return_value_id: start.port,
                return_value_func_id: start_func,
            });
        }
    }
    Ok(out)
}

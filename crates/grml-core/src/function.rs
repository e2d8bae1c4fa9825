//! Function entities: typed ports, properties and representation state.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::id::{FunctionId, ModelId, PortId};
use crate::port::{Port, PortKind, PortRef};
use crate::property::Properties;
use crate::registry::{FunctionSpec, PortSync};
use crate::representation::{BlockState, CodeState, Representation, RepresentationKind};
use crate::warning::Warnings;

/// A processing step in a model.
///
/// Functions live in the [`ModelGraph`](crate::graph::ModelGraph) arena and
/// refer to their parent model and optional submodel by id.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    /// Registry name of the function kind.
    pub kind: String,
    pub title: String,
    pub parameters: Vec<Port>,
    pub return_values: Vec<Port>,
    pub properties: Properties,
    pub warnings: Warnings,
    pub errors: Vec<String>,
    pub removable: bool,
    pub executable: bool,
    pub representations: BTreeMap<RepresentationKind, Representation>,
    /// Logical time of the last code-affecting edit.
    pub code_edit_stamp: u64,
    /// Logical time of the edit that was last computed by the kernel. Zero
    /// means never computed.
    pub computed_stamp: u64,
    /// Model containing this function.
    pub model: ModelId,
    /// Nested model, for model functions.
    pub submodel: Option<ModelId>,
    pub(crate) port_sync: Option<PortSync>,
    pub(crate) fixed_return_values: usize,
}

impl Function {
    /// Builds a function with the ports, properties and representations
    /// declared by `spec`. The submodel, if any, is attached by the graph.
    pub(crate) fn from_spec(spec: &FunctionSpec, id: FunctionId, model: ModelId, stamp: u64) -> Self {
        let parameters = spec
            .parameters
            .iter()
            .map(|p| Port::new(PortKind::Parameter, id, p.name.clone(), p.data_type.clone()))
            .collect();
        let return_values = spec
            .return_values
            .iter()
            .map(|p| Port::new(PortKind::ReturnValue, id, p.name.clone(), p.data_type.clone()))
            .collect();
        let representations = spec
            .representations
            .iter()
            .map(|kind| (*kind, Representation::empty(*kind)))
            .collect();

        Function {
            id,
            kind: spec.name.clone(),
            title: spec.verbose_name.clone(),
            parameters,
            return_values,
            properties: Properties::from_specs(&spec.properties),
            warnings: spec.warnings.iter().cloned().collect(),
            errors: Vec::new(),
            removable: spec.removable,
            executable: spec.executable,
            representations,
            code_edit_stamp: stamp,
            computed_stamp: 0,
            model,
            submodel: None,
            port_sync: spec.port_sync.clone(),
            fixed_return_values: spec.return_values.len(),
        }
    }

    pub fn ports(&self, kind: PortKind) -> &[Port] {
        match kind {
            PortKind::Parameter => &self.parameters,
            PortKind::ReturnValue => &self.return_values,
        }
    }

    pub(crate) fn ports_mut(&mut self, kind: PortKind) -> &mut Vec<Port> {
        match kind {
            PortKind::Parameter => &mut self.parameters,
            PortKind::ReturnValue => &mut self.return_values,
        }
    }

    /// Finds a port on either side.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.parameters
            .iter()
            .chain(self.return_values.iter())
            .find(|p| p.id == id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.parameters
            .iter_mut()
            .chain(self.return_values.iter_mut())
            .find(|p| p.id == id)
    }

    /// Position of a port within its side.
    pub fn port_index(&self, id: PortId) -> Option<(PortKind, usize)> {
        if let Some(i) = self.parameters.iter().position(|p| p.id == id) {
            return Some((PortKind::Parameter, i));
        }
        self.return_values
            .iter()
            .position(|p| p.id == id)
            .map(|i| (PortKind::ReturnValue, i))
    }

    pub fn port_ref(&self, kind: PortKind, index: usize) -> Result<PortRef, CoreError> {
        self.ports(kind)
            .get(index)
            .map(Port::port_ref)
            .ok_or_else(|| CoreError::MalformedSerialization {
                reason: format!("function {} has no {} at index {}", self.id, kind, index),
            })
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn return_names(&self) -> Vec<&str> {
        self.return_values.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn supports(&self, kind: RepresentationKind) -> bool {
        self.representations.contains_key(&kind)
    }

    pub fn block(&self) -> Option<&BlockState> {
        match self.representations.get(&RepresentationKind::Block) {
            Some(Representation::Block(state)) => Some(state),
            _ => None,
        }
    }

    pub fn block_mut(&mut self) -> Option<&mut BlockState> {
        match self.representations.get_mut(&RepresentationKind::Block) {
            Some(Representation::Block(state)) => Some(state),
            _ => None,
        }
    }

    pub fn code_state(&self) -> Option<&CodeState> {
        match self.representations.get(&RepresentationKind::Code) {
            Some(Representation::Code(state)) => Some(state),
            _ => None,
        }
    }

    /// Current snippet text, or empty when there is no code representation.
    pub fn code(&self) -> &str {
        self.code_state().map(|c| c.code.as_str()).unwrap_or("")
    }

    /// Replaces the snippet text. Returns false when the function has no
    /// code representation.
    pub(crate) fn store_code(&mut self, code: String) -> bool {
        match self.representations.get_mut(&RepresentationKind::Code) {
            Some(Representation::Code(state)) => {
                state.code = code;
                true
            }
            _ => false,
        }
    }

    /// Python that prints every return value as `name: value`.
    pub fn ret_val_code(&self) -> String {
        self.return_values
            .iter()
            .map(|r| format!("print(\"{{0}}: {{1}}\".format('{0}', {0}))", r.name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the kernel result is older than the last code edit.
    pub fn is_stale(&self) -> bool {
        self.code_edit_stamp > self.computed_stamp
    }

    pub fn is_model_function(&self) -> bool {
        self.submodel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn spec() -> FunctionSpec {
        FunctionSpec::new("split", "Split")
            .parameter("", DataType::tensor())
            .return_value("train", DataType::tensor())
            .return_value("test", DataType::tensor())
    }

    #[test]
    fn ports_follow_spec() {
        let id = FunctionId::new();
        let f = Function::from_spec(&spec(), id, ModelId(0), 4);
        assert_eq!(f.parameters.len(), 1);
        assert_eq!(f.return_names(), vec!["train", "test"]);
        assert!(f.return_values.iter().all(|p| p.owner == id));
        assert_eq!(f.code_edit_stamp, 4);
        assert_eq!(f.computed_stamp, 0);
        assert!(f.is_stale());
    }

    #[test]
    fn port_lookup_reports_side_and_index() {
        let f = Function::from_spec(&spec(), FunctionId::new(), ModelId(0), 1);
        let test = f.return_values[1].id;
        assert_eq!(f.port_index(test), Some((PortKind::ReturnValue, 1)));
        assert_eq!(f.port(test).map(|p| p.name.as_str()), Some("test"));
        assert!(f.port_index(PortId::new()).is_none());
    }

    #[test]
    fn ret_val_code_prints_each_return_value() {
        let f = Function::from_spec(&spec(), FunctionId::new(), ModelId(0), 1);
        assert_eq!(
            f.ret_val_code(),
            "print(\"{0}: {1}\".format('train', train))\nprint(\"{0}: {1}\".format('test', test))"
        );
    }

    #[test]
    fn block_only_functions_have_no_code() {
        let mut f = Function::from_spec(&spec().block_only(), FunctionId::new(), ModelId(0), 1);
        assert!(f.block().is_some());
        assert!(!f.store_code("x = 1".into()));
        assert_eq!(f.code(), "");
    }
}

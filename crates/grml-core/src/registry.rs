//! The registry of function kinds and model kinds.
//!
//! A [`Registry`] is an ordinary value: build one, register kinds into it
//! (see [`crate::builtin::register_builtins`]) and pass it to whatever needs
//! to construct functions, deserialize models or list the block library.
//! Independent registries never share state.

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::property::PropertySpec;
use crate::representation::RepresentationKind;
use crate::template::CodeTemplate;
use crate::types::DataType;
use crate::warning::Warning;

/// Declared name and type of a pre-allocated port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub data_type: DataType,
}

/// How a composite function keeps its ports in step with its submodel.
#[derive(Debug, Clone, PartialEq)]
pub enum PortSync {
    /// One parameter per nested `input` function, and one return value per
    /// nested `output` function after the fixed return values.
    NestedIo { input: String, output: String },
}

/// Everything needed to construct a function of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    /// Registry key, serialized as `originalName`.
    pub name: String,
    /// Default display title.
    pub verbose_name: String,
    pub description: String,
    pub parameters: Vec<PortSpec>,
    pub return_values: Vec<PortSpec>,
    pub properties: Vec<PropertySpec>,
    pub removable: bool,
    pub executable: bool,
    pub representations: Vec<RepresentationKind>,
    pub code: Option<CodeTemplate>,
    /// Code is user-owned text and is not regenerated from the template.
    pub free_form_code: bool,
    /// Model kind of the nested model, for model functions.
    pub submodel: Option<String>,
    pub port_sync: Option<PortSync>,
    /// Warnings attached on construction.
    pub warnings: Vec<Warning>,
}

impl FunctionSpec {
    pub fn new(name: &str, verbose_name: &str) -> Self {
        FunctionSpec {
            name: name.to_string(),
            verbose_name: verbose_name.to_string(),
            description: String::new(),
            parameters: Vec::new(),
            return_values: Vec::new(),
            properties: Vec::new(),
            removable: true,
            executable: false,
            representations: vec![RepresentationKind::Block, RepresentationKind::Code],
            code: None,
            free_form_code: false,
            submodel: None,
            port_sync: None,
            warnings: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn parameter(mut self, name: &str, data_type: DataType) -> Self {
        self.parameters.push(PortSpec {
            name: name.to_string(),
            data_type,
        });
        self
    }

    pub fn return_value(mut self, name: &str, data_type: DataType) -> Self {
        self.return_values.push(PortSpec {
            name: name.to_string(),
            data_type,
        });
        self
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    pub fn code<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.code = Some(CodeTemplate::new(lines));
        self
    }

    pub fn free_form(mut self) -> Self {
        self.free_form_code = true;
        self
    }

    pub fn not_removable(mut self) -> Self {
        self.removable = false;
        self
    }

    pub fn executable(mut self) -> Self {
        self.executable = true;
        self
    }

    /// Restricts the function to the graphical representation.
    pub fn block_only(mut self) -> Self {
        self.representations = vec![RepresentationKind::Block];
        self
    }

    pub fn submodel(mut self, model_kind: &str) -> Self {
        self.submodel = Some(model_kind.to_string());
        self
    }

    pub fn sync_ports(mut self, sync: PortSync) -> Self {
        self.port_sync = Some(sync);
        self
    }

    pub fn warn(mut self, warning: Warning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn supports(&self, kind: RepresentationKind) -> bool {
        self.representations.contains(&kind)
    }
}

/// A function placed into a new model of some kind.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialChild {
    pub function: String,
    pub x: f64,
    pub y: f64,
}

/// Everything needed to construct a model of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Registry key, serialized as the model `type`.
    pub kind: String,
    pub default_name: String,
    /// Library categories offered while this model is active.
    pub library: Vec<String>,
    pub initial_children: Vec<InitialChild>,
    /// When set, only functions reachable from the first child of this kind
    /// count as the model's layers.
    pub layer_root: Option<String>,
}

impl ModelSpec {
    pub fn new(kind: &str, default_name: &str) -> Self {
        ModelSpec {
            kind: kind.to_string(),
            default_name: default_name.to_string(),
            library: Vec::new(),
            initial_children: Vec::new(),
            layer_root: None,
        }
    }

    pub fn offers(mut self, category: &str) -> Self {
        self.library.push(category.to_string());
        self
    }

    pub fn starts_with(mut self, function: &str, x: f64, y: f64) -> Self {
        self.initial_children.push(InitialChild {
            function: function.to_string(),
            x,
            y,
        });
        self
    }

    pub fn layered_from(mut self, function: &str) -> Self {
        self.layer_root = Some(function.to_string());
        self
    }
}

/// Registered function kinds, model kinds and library categories.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: IndexMap<String, FunctionSpec>,
    models: IndexMap<String, ModelSpec>,
    library: IndexMap<String, Vec<String>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in kinds registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry)
            .expect("built-in kinds have distinct names");
        registry
    }

    pub fn register_function(&mut self, spec: FunctionSpec) -> Result<(), CoreError> {
        if self.functions.contains_key(&spec.name) {
            return Err(CoreError::DuplicateFunctionKind { name: spec.name });
        }
        self.functions.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn register_model(&mut self, spec: ModelSpec) -> Result<(), CoreError> {
        if self.models.contains_key(&spec.kind) {
            return Err(CoreError::DuplicateModelKind { kind: spec.kind });
        }
        self.models.insert(spec.kind.clone(), spec);
        Ok(())
    }

    /// Lists a registered function under a library category. Categories keep
    /// the order of their first use.
    pub fn add_to_library(&mut self, category: &str, function: &str) -> Result<(), CoreError> {
        if !self.functions.contains_key(function) {
            return Err(CoreError::UnknownFunctionKind {
                name: function.to_string(),
            });
        }
        let entries = self.library.entry(category.to_string()).or_default();
        if !entries.iter().any(|e| e == function) {
            entries.push(function.to_string());
        }
        Ok(())
    }

    pub fn function(&self, name: &str) -> Result<&FunctionSpec, CoreError> {
        self.functions
            .get(name)
            .ok_or_else(|| CoreError::UnknownFunctionKind {
                name: name.to_string(),
            })
    }

    pub fn model(&self, kind: &str) -> Result<&ModelSpec, CoreError> {
        self.models
            .get(kind)
            .ok_or_else(|| CoreError::UnknownModelKind {
                kind: kind.to_string(),
            })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    /// Function names listed under `category`.
    pub fn category(&self, category: &str) -> &[String] {
        self.library
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = &String> {
        self.library.keys()
    }
}

//! Declarative property schema and the per-function property bag.
//!
//! A function kind declares its properties as [`PropertySpec`]s: the kind of
//! editor widget, a default value, validators and an optional
//! [`PropertyEffect`] describing what else changes when the value changes.
//! Instances hold plain JSON values; behavior lives in the graph, which
//! applies effects when a [`PropertyPatch`] is committed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::port::PortKind;
use crate::types::DataType;

/// The editor widget and value domain of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    Boolean,
    String,
    /// Multi-line source text.
    Code,
    Number,
    Url,
    /// Arbitrary JSON.
    Json,
    /// A file path.
    File,
    /// A number within `[min, max]`.
    Range { min: f64, max: f64, step: f64 },
    /// One of a fixed set of strings.
    Select { options: Vec<String> },
}

/// Extra constraints on a property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "arg", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validator {
    /// Value must be a non-empty string or a non-null value.
    Required,
    Min(f64),
    Max(f64),
    MaxLength(usize),
}

/// A declared side effect of changing a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyEffect {
    /// Set the type of one of the function's own ports from the selected
    /// option. Values not in `options` map to `fallback`.
    PortType {
        port: PortKind,
        index: usize,
        options: Vec<(String, DataType)>,
        fallback: DataType,
    },
}

impl PropertyEffect {
    /// Resolves the port type this effect assigns for `value`.
    pub fn port_type_for(&self, value: &Value) -> (PortKind, usize, DataType) {
        match self {
            PropertyEffect::PortType {
                port,
                index,
                options,
                fallback,
            } => {
                let ty = value
                    .as_str()
                    .and_then(|v| options.iter().find(|(name, _)| name == v))
                    .map(|(_, ty)| ty.clone())
                    .unwrap_or_else(|| fallback.clone());
                (*port, *index, ty)
            }
        }
    }
}

/// Declaration of one property of a function kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub key: String,
    pub label: String,
    pub kind: PropertyKind,
    pub default: Value,
    pub description: Option<String>,
    pub validators: Vec<Validator>,
    pub effect: Option<PropertyEffect>,
}

impl PropertySpec {
    pub fn new(key: &str, label: &str, kind: PropertyKind, default: Value) -> Self {
        PropertySpec {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            default,
            description: None,
            validators: Vec::new(),
            effect: None,
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn validated(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_effect(mut self, effect: PropertyEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// A live property on a function: its schema plus the current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub label: String,
    pub kind: PropertyKind,
    pub value: Value,
    pub description: Option<String>,
    pub validators: Vec<Validator>,
    pub effect: Option<PropertyEffect>,
}

impl Property {
    fn from_spec(spec: &PropertySpec) -> Self {
        Property {
            label: spec.label.clone(),
            kind: spec.kind.clone(),
            value: spec.default.clone(),
            description: spec.description.clone(),
            validators: spec.validators.clone(),
            effect: spec.effect.clone(),
        }
    }

    /// Checks `value` against the kind and every validator.
    pub fn check(&self, key: &str, value: &Value) -> Result<(), CoreError> {
        let invalid = |reason: String| CoreError::InvalidProperty {
            key: key.to_string(),
            reason,
        };

        match &self.kind {
            PropertyKind::Boolean if !value.is_boolean() => {
                return Err(invalid("expected a boolean".into()));
            }
            PropertyKind::String | PropertyKind::Code | PropertyKind::File
                if !value.is_string() =>
            {
                return Err(invalid("expected a string".into()));
            }
            PropertyKind::Url => match value.as_str() {
                Some(url)
                    if url.is_empty()
                        || url.starts_with("http://")
                        || url.starts_with("https://") => {}
                _ => return Err(invalid("expected an http(s) url".into())),
            },
            PropertyKind::Number if !value.is_number() => {
                return Err(invalid("expected a number".into()));
            }
            PropertyKind::Range { min, max, .. } => match value.as_f64() {
                Some(n) if n >= *min && n <= *max => {}
                Some(n) => return Err(invalid(format!("{} is outside [{}, {}]", n, min, max))),
                None => return Err(invalid("expected a number".into())),
            },
            PropertyKind::Select { options } => match value.as_str() {
                Some(v) if options.iter().any(|o| o == v) => {}
                _ => return Err(invalid(format!("expected one of {:?}", options))),
            },
            _ => {}
        }

        for validator in &self.validators {
            match validator {
                Validator::Required => {
                    let empty = value.is_null() || value.as_str().is_some_and(str::is_empty);
                    if empty {
                        return Err(invalid("a value is required".into()));
                    }
                }
                Validator::Min(min) => {
                    if value.as_f64().is_some_and(|n| n < *min) {
                        return Err(invalid(format!("must be at least {}", min)));
                    }
                }
                Validator::Max(max) => {
                    if value.as_f64().is_some_and(|n| n > *max) {
                        return Err(invalid(format!("must be at most {}", max)));
                    }
                }
                Validator::MaxLength(len) => {
                    if value.as_str().is_some_and(|s| s.chars().count() > *len) {
                        return Err(invalid(format!("must be at most {} characters", len)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A requested change to one property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    pub key: String,
    pub value: Value,
}

impl PropertyPatch {
    pub fn new(key: &str, value: Value) -> Self {
        PropertyPatch {
            key: key.to_string(),
            value,
        }
    }
}

/// Ordered property bag of one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, Property>);

impl Properties {
    pub fn from_specs(specs: &[PropertySpec]) -> Self {
        Properties(
            specs
                .iter()
                .map(|spec| (spec.key.clone(), Property::from_spec(spec)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.0.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).map(|p| &p.value)
    }

    /// Validates and stores `value`. Returns the declared effect, if any, for
    /// the caller to apply.
    pub fn set(&mut self, key: &str, value: Value) -> Result<Option<PropertyEffect>, CoreError> {
        let property = self.0.get_mut(key).ok_or_else(|| CoreError::UnknownProperty {
            key: key.to_string(),
        })?;
        property.check(key, &value)?;
        property.value = value;
        Ok(property.effect.clone())
    }

    /// Flattened `key -> value` view used in serialized forms.
    pub fn values(&self) -> IndexMap<String, Value> {
        self.0
            .iter()
            .map(|(k, p)| (k.clone(), p.value.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

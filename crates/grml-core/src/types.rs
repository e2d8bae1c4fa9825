//! Structural data types carried by ports and the connection compatibility
//! rule.
//!
//! Types are structural, not nominal: two ports agree when their tags agree,
//! with special handling for unions (see [`compatible`]). Shapes, tuple arity
//! and element types are informational only and never checked when wiring.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single tensor dimension: a fixed extent or a wildcard (`*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    Fixed(u64),
    Any,
}

/// Training state of a model value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelState {
    #[default]
    Uninitialized,
    Initialized,
    Trained,
}

/// The tag of a [`DataType`], used for all compatibility decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    None,
    String,
    Number,
    Scalar,
    Tensor,
    Model,
    Array,
    Tuple,
    Batches,
    Dataset,
    Union,
}

/// A value type flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// No declared type. Displays as "Unknown type".
    #[default]
    None,
    String,
    Number,
    Scalar,
    /// A tensor, optionally with a (possibly partial) shape.
    Tensor { shape: Vec<Dim> },
    /// A model value, e.g. the output of a composite network function.
    Model {
        state: ModelState,
        input_shape: Vec<u64>,
    },
    /// A homogeneous list.
    Array { of: Box<DataType> },
    /// A fixed-size tuple with optional per-element labels.
    Tuple { of: Vec<DataType>, labels: Vec<String> },
    /// Batched values.
    Batches { of: Box<DataType> },
    /// A dataset, optionally of a known element type.
    Dataset { of: Option<Box<DataType>> },
    /// Any one of the member types.
    Union { of: Vec<DataType> },
}

impl DataType {
    /// An unshaped tensor.
    pub fn tensor() -> Self {
        DataType::Tensor { shape: Vec::new() }
    }

    /// A tensor with the given shape.
    pub fn tensor_of(shape: Vec<Dim>) -> Self {
        DataType::Tensor { shape }
    }

    /// An uninitialized model.
    pub fn model() -> Self {
        DataType::Model {
            state: ModelState::Uninitialized,
            input_shape: Vec::new(),
        }
    }

    /// A dataset with no element type.
    pub fn dataset() -> Self {
        DataType::Dataset { of: None }
    }

    pub fn dataset_of(of: DataType) -> Self {
        DataType::Dataset {
            of: Some(Box::new(of)),
        }
    }

    pub fn array_of(of: DataType) -> Self {
        DataType::Array { of: Box::new(of) }
    }

    pub fn batches_of(of: DataType) -> Self {
        DataType::Batches { of: Box::new(of) }
    }

    /// An unlabelled tuple.
    pub fn tuple(of: Vec<DataType>) -> Self {
        DataType::Tuple {
            of,
            labels: Vec::new(),
        }
    }

    /// A tuple with one label per element.
    pub fn labelled_tuple(entries: Vec<(&str, DataType)>) -> Self {
        let (labels, of) = entries
            .into_iter()
            .map(|(label, ty)| (label.to_string(), ty))
            .unzip();
        DataType::Tuple { of, labels }
    }

    pub fn union(of: Vec<DataType>) -> Self {
        DataType::Union { of }
    }

    /// Returns the tag of this type.
    pub fn tag(&self) -> TypeTag {
        match self {
            DataType::None => TypeTag::None,
            DataType::String => TypeTag::String,
            DataType::Number => TypeTag::Number,
            DataType::Scalar => TypeTag::Scalar,
            DataType::Tensor { .. } => TypeTag::Tensor,
            DataType::Model { .. } => TypeTag::Model,
            DataType::Array { .. } => TypeTag::Array,
            DataType::Tuple { .. } => TypeTag::Tuple,
            DataType::Batches { .. } => TypeTag::Batches,
            DataType::Dataset { .. } => TypeTag::Dataset,
            DataType::Union { .. } => TypeTag::Union,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, DataType::Union { .. })
    }

    /// Union members, or an empty slice for any other type.
    pub fn members(&self) -> &[DataType] {
        match self {
            DataType::Union { of } => of,
            _ => &[],
        }
    }

    fn has_member_tag(&self, tag: TypeTag) -> bool {
        self.members().iter().any(|m| m.tag() == tag)
    }
}

/// Decides whether a return value of type `output` may feed a parameter of
/// type `input`.
///
/// Rules, first match wins:
/// 1. both are non-union types with the same tag;
/// 2. `input` is a union with a member whose tag equals `output`'s tag;
/// 3. `output` is a union with a member whose tag equals `input`'s tag;
/// 4. both are unions and more than one of `input`'s members has a tag that
///    also appears among `output`'s members.
///
/// Rule 4 deliberately requires two shared members: `UNION(A, B)` does not
/// accept `UNION(B, C)`.
pub fn compatible(output: &DataType, input: &DataType) -> bool {
    if !output.is_union() && !input.is_union() {
        return output.tag() == input.tag();
    }
    if input.has_member_tag(output.tag()) {
        return true;
    }
    if output.has_member_tag(input.tag()) {
        return true;
    }
    if output.is_union() && input.is_union() {
        let overlap = input
            .members()
            .iter()
            .filter(|m| output.has_member_tag(m.tag()))
            .count();
        return overlap > 1;
    }
    false
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{}", n),
            Dim::Any => write!(f, "*"),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::None => write!(f, "Unknown type"),
            DataType::String => write!(f, "String"),
            DataType::Number => write!(f, "Number"),
            DataType::Scalar => write!(f, "Scalar"),
            DataType::Tensor { shape } if shape.is_empty() => write!(f, "Tensor"),
            DataType::Tensor { shape } => {
                let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
                write!(f, "Tensor [ {} ]", dims.join(","))
            }
            DataType::Model { .. } => write!(f, "Model"),
            DataType::Array { of } => write!(f, "List of {}", of),
            DataType::Tuple { of, labels } => {
                writeln!(f, "(")?;
                for (i, ty) in of.iter().enumerate() {
                    match labels.get(i) {
                        Some(label) => writeln!(f, "  {}: {}", label, ty)?,
                        None => writeln!(f, "  {}", ty)?,
                    }
                }
                write!(f, ")")
            }
            DataType::Batches { of } => write!(f, "Batches of {}", of),
            DataType::Dataset { of: Some(of) } => write!(f, "Dataset of {}", of),
            DataType::Dataset { of: None } => write!(f, "Dataset"),
            DataType::Union { of } => {
                let parts: Vec<String> = of.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}

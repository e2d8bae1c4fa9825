//! Error type for editor operations.

use grml_check::CheckError;
use grml_core::error::CoreError;
use grml_core::id::FunctionId;
use grml_core::types::TypeTag;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Check(#[from] CheckError),

    /// Code refers to a variable whose type does not fit the port it lands on.
    #[error("variable '{name}' can not be inserted here: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        name: String,
        expected: TypeTag,
        found: TypeTag,
    },

    #[error("function {function} has no code representation")]
    NoCodeRepresentation { function: FunctionId },

    #[error("the property panel is not bound to a function")]
    PanelNotBound,

    #[error("unknown panel entry: {key}")]
    UnknownEntry { key: String },
}

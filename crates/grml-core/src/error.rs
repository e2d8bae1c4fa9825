//! Core error types for grml-core.
//!
//! Structural failures (unknown registry names, dangling ids, malformed
//! serialized data) are hard errors returned to the caller. Connection
//! attempts that break a wiring rule get their own [`ConnectError`] so
//! editors can tell a rejected drop from a corrupted model.

use thiserror::Error;

use crate::id::{ConnectionId, FunctionId, ModelId, PortId};
use crate::port::PortKind;

/// Core errors produced by the grml-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A function kind was registered twice.
    #[error("duplicate function kind: '{name}'")]
    DuplicateFunctionKind { name: String },

    /// A model kind was registered twice.
    #[error("duplicate model kind: '{kind}'")]
    DuplicateModelKind { kind: String },

    /// No function kind is registered under this name.
    #[error("unknown function kind: '{name}'")]
    UnknownFunctionKind { name: String },

    /// No model kind is registered under this type name.
    #[error("unknown model kind: '{kind}'")]
    UnknownModelKind { kind: String },

    #[error("function not found: {id}")]
    FunctionNotFound { id: FunctionId },

    #[error("model not found: {id}")]
    ModelNotFound { id: ModelId },

    #[error("port {port} not found on function {function}")]
    PortNotFound { function: FunctionId, port: PortId },

    #[error("connection not found: {id}")]
    ConnectionNotFound { id: ConnectionId },

    /// Serialized data lists more ports than the function kind allocates.
    #[error("function {function} allocates {expected} {kind} port(s), serialized data has {actual}")]
    PortCountMismatch {
        function: FunctionId,
        kind: PortKind,
        expected: usize,
        actual: usize,
    },

    /// The function does not own a nested model.
    #[error("function {function} has no submodel")]
    NoSubmodel { function: FunctionId },

    #[error("unknown property '{key}'")]
    UnknownProperty { key: String },

    #[error("invalid value for property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("malformed serialization: {reason}")]
    MalformedSerialization { reason: String },

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Reasons an interactive or inferred connection is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The drag has no start port yet.
    #[error("connection has no source")]
    MissingSource,

    /// The drag has no end port yet.
    #[error("connection has no destination")]
    MissingDestination,

    #[error("port {port} is not a return value")]
    NotAReturnValue { port: PortId },

    #[error("port {port} is not a parameter")]
    NotAParameter { port: PortId },

    #[error("cannot connect {output} to {input}")]
    IncompatibleTypes { output: String, input: String },

    /// Source and destination belong to the same function.
    #[error("function {function} cannot be connected to itself")]
    SelfLoop { function: FunctionId },

    #[error("ports {start} and {end} are already connected")]
    Duplicate { start: PortId, end: PortId },

    /// The graphical editor allows one incoming connection per parameter.
    #[error("parameter {port} is already connected")]
    InputOccupied { port: PortId },
}

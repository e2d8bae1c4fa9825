//! Model diagnostics with enough context to point at the offending entity.

use grml_core::error::CoreError;
use grml_core::id::{ConnectionId, FunctionId, ModelId, PortId};
use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while validating a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A parameter has no incoming connection, so the function has no data.
    #[error("parameter {port} of function {function} is not connected")]
    UnconnectedParameter {
        function: FunctionId,
        port: PortId,
        /// Index of the parameter.
        index: usize,
    },

    /// A parameter has more than one incoming connection.
    #[error("parameter {port} of function {function} has {count} incoming connections")]
    MultipleSources {
        function: FunctionId,
        port: PortId,
        count: usize,
    },

    /// A connection's port types no longer match.
    #[error("connection {connection}: cannot connect {output} to {input}")]
    IncompatibleConnection {
        connection: ConnectionId,
        output: String,
        input: String,
    },

    /// Two or more connections join the same pair of ports.
    #[error("ports {start} and {end} are connected {count} times")]
    DuplicateConnection {
        start: PortId,
        end: PortId,
        count: usize,
    },

    /// A variable no child return value carries any more.
    #[error("variable '{name}' in model {model} is not defined by any function")]
    DanglingVariable { model: ModelId, name: String },

    /// Functions of a model feed into each other.
    #[error("model {model} contains a cycle through {} functions", .functions.len())]
    Cycle {
        model: ModelId,
        functions: Vec<FunctionId>,
    },

    /// A layered model has no input function.
    #[error("model {model} is incomplete: it has no input function")]
    IncompleteModel {
        model: ModelId,
        /// The model function owning it.
        owner: Option<FunctionId>,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::IncompatibleConnection { .. }
            | Diagnostic::Cycle { .. }
            | Diagnostic::IncompleteModel { .. } => Severity::Error,
            Diagnostic::UnconnectedParameter { .. }
            | Diagnostic::MultipleSources { .. }
            | Diagnostic::DuplicateConnection { .. }
            | Diagnostic::DanglingVariable { .. } => Severity::Warning,
        }
    }

    /// The function the diagnostic is about, if it is about one.
    pub fn function(&self) -> Option<FunctionId> {
        match self {
            Diagnostic::UnconnectedParameter { function, .. }
            | Diagnostic::MultipleSources { function, .. } => Some(*function),
            Diagnostic::IncompleteModel { owner, .. } => *owner,
            Diagnostic::Cycle { functions, .. } => functions.first().copied(),
            _ => None,
        }
    }
}

/// Errors produced while checking or ordering a model.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No topological order exists.
    #[error("model {model} contains a cycle at function {function}")]
    Cyclic { model: ModelId, function: FunctionId },
}

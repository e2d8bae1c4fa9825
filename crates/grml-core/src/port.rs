//! Function ports: parameters (inputs) and return values (outputs).
//!
//! A port is owned exclusively by its function. The port's `name` doubles as
//! the variable name used in generated code; it may be empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{ConnectionId, FunctionId, PortId};
use crate::types::DataType;
use crate::warning::{Warning, Warnings};

/// Which side of a function a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortKind {
    /// An input.
    Parameter,
    /// An output.
    ReturnValue,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Parameter => write!(f, "parameter"),
            PortKind::ReturnValue => write!(f, "return value"),
        }
    }
}

/// Addresses a port through its owning function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub function: FunctionId,
    pub port: PortId,
}

impl PortRef {
    pub fn new(function: FunctionId, port: PortId) -> Self {
        PortRef { function, port }
    }
}

/// A typed endpoint of a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub kind: PortKind,
    /// Variable name. Empty means unnamed.
    pub name: String,
    pub data_type: DataType,
    /// Owning function (back reference).
    pub owner: FunctionId,
    connections: SmallVec<[ConnectionId; 2]>,
    warnings: Warnings,
}

impl Port {
    pub fn new(kind: PortKind, owner: FunctionId, name: impl Into<String>, data_type: DataType) -> Self {
        Port {
            id: PortId::new(),
            kind,
            name: name.into(),
            data_type,
            owner,
            connections: SmallVec::new(),
            warnings: Warnings::new(),
        }
    }

    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.owner, self.id)
    }

    /// Connections in the order they were made.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    /// Adds a warning unless already present.
    pub fn warn(&mut self, warning: Warning) -> bool {
        self.warnings.add(warning)
    }

    pub fn clear_warning(&mut self, warning: &Warning) -> bool {
        self.warnings.remove(warning)
    }

    pub(crate) fn attach(&mut self, connection: ConnectionId) {
        self.connections.push(connection);
    }

    pub(crate) fn detach(&mut self, connection: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| *c != connection);
        self.connections.len() != before
    }
}

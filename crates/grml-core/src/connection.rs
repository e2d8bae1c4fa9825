//! Directed connections from a return value to a parameter.
//!
//! A [`Connection`] in the graph is always finalized: both ends exist.
//! Half-built connections during a drag are [`ConnectionDraft`]s, and
//! connections arriving from peers are [`ConnectionDescriptor`]s. Every path
//! into the graph goes through [`ConnectionRequest`] and one resolver,
//! [`ModelGraph::resolve`](crate::graph::ModelGraph::resolve).

use serde::{Deserialize, Serialize};

use crate::error::ConnectError;
use crate::id::{ConnectionId, FunctionId, PortId};
use crate::port::PortRef;

/// A live edge between two ports of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    /// The return value the data comes from.
    pub start: PortRef,
    /// The parameter the data flows into.
    pub end: PortRef,
}

impl Connection {
    /// The id-only form exchanged with peers.
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            param_func_id: self.end.function,
            param_id: self.end.port,
            return_value_id: self.start.port,
            return_value_func_id: self.start.function,
        }
    }
}

/// Serialized connection, resolvable against any copy of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    pub param_func_id: FunctionId,
    pub param_id: PortId,
    pub return_value_id: PortId,
    pub return_value_func_id: FunctionId,
}

impl ConnectionDescriptor {
    pub fn start(&self) -> PortRef {
        PortRef::new(self.return_value_func_id, self.return_value_id)
    }

    pub fn end(&self) -> PortRef {
        PortRef::new(self.param_func_id, self.param_id)
    }
}

/// Either an already-resolved connection or one that still has to be looked
/// up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRequest {
    Live(ConnectionId),
    Serialized(ConnectionDescriptor),
}

impl From<ConnectionDescriptor> for ConnectionRequest {
    fn from(descriptor: ConnectionDescriptor) -> Self {
        ConnectionRequest::Serialized(descriptor)
    }
}

/// A connection under construction, e.g. while dragging from a port.
///
/// Either end may be set first; the drop handler finalizes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionDraft {
    pub start: Option<PortRef>,
    pub end: Option<PortRef>,
}

impl ConnectionDraft {
    pub fn from_start(start: PortRef) -> Self {
        ConnectionDraft {
            start: Some(start),
            end: None,
        }
    }

    pub fn from_end(end: PortRef) -> Self {
        ConnectionDraft {
            start: None,
            end: Some(end),
        }
    }

    /// Returns `(start, end)` once both ends are known.
    pub fn finalize(self) -> Result<(PortRef, PortRef), ConnectError> {
        let start = self.start.ok_or(ConnectError::MissingSource)?;
        let end = self.end.ok_or(ConnectError::MissingDestination)?;
        Ok((start, end))
    }
}

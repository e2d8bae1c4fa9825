//! Stable ID newtypes for model entities.
//!
//! Functions and ports are identified by UUIDs because every connected editor
//! instance holds its own deserialized copy of the model and entities are
//! matched across instances by id, never by object identity. Models and
//! connections only need to be unique inside one [`ModelGraph`], so they use
//! arena counters like the rest of the graph.
//!
//! [`ModelGraph`]: crate::graph::ModelGraph

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Function identity, shared across all peers holding the same model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub Uuid);

/// Port (parameter or return value) identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub Uuid);

/// Model identity inside one graph arena. Not serialized: a nested model is
/// addressed across peers through the id of the function that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// Connection identity inside one graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl FunctionId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        FunctionId(Uuid::new_v4())
    }
}

impl Default for FunctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl PortId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        PortId(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

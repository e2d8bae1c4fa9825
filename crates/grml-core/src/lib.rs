pub mod types;
pub mod id;
pub mod error;
pub mod warning;
pub mod port;
pub mod connection;
pub mod property;
pub mod template;
pub mod representation;
pub mod registry;
pub mod builtin;
pub mod function;
pub mod model;
pub mod graph;
pub mod propagate;
pub mod serialize;

// Re-export commonly used types
pub use types::{compatible, DataType, Dim, ModelState, TypeTag};
pub use id::{ConnectionId, FunctionId, ModelId, PortId};
pub use error::{ConnectError, CoreError};
pub use warning::{Warning, Warnings};
pub use port::{Port, PortKind, PortRef};
pub use connection::{Connection, ConnectionDescriptor, ConnectionDraft, ConnectionRequest};
pub use property::{Properties, Property, PropertyEffect, PropertyKind, PropertyPatch, PropertySpec, Validator};
pub use template::CodeTemplate;
pub use representation::{BlockState, CodeState, Representation, RepresentationKind};
pub use registry::{FunctionSpec, ModelSpec, PortSpec, PortSync, Registry};
pub use function::Function;
pub use model::{Model, Variable};
pub use graph::{Closure, Connected, DuplicatePolicy, ModelGraph, RemovedFunction};
pub use propagate::propagate_name;
pub use serialize::{connection_descriptors, function_connection_descriptors, FunctionSerialization, ModelSerialization};

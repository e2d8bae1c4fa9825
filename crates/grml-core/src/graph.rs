//! ModelGraph: the arena holding every model, function and connection of one
//! editor instance.
//!
//! All cross references are ids: a function names its parent model and
//! optional submodel, a model names its parent function, ports list the
//! connections attached to them and connections name both end ports. The
//! graph is the only place these references are created or removed, so the
//! two sides of each reference stay in step.
//!
//! Logical time comes from [`ModelGraph::tick`]; function stamps compare
//! against it instead of wall-clock time.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::connection::{Connection, ConnectionDescriptor, ConnectionRequest};
use crate::error::{ConnectError, CoreError};
use crate::function::Function;
use crate::id::{ConnectionId, FunctionId, ModelId};
use crate::model::{Model, Variable};
use crate::port::{Port, PortKind, PortRef};
use crate::property::PropertyPatch;
use crate::propagate::propagate_name;
use crate::registry::{PortSync, Registry};
use crate::types::{compatible, DataType};
use crate::warning::Warning;

/// What happens when the same two ports are connected twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Parallel edges are created.
    #[default]
    Legacy,
    /// A second edge between the same ports is refused.
    Reject,
}

/// Outcome of a successful connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub id: ConnectionId,
    /// Ports whose names changed through propagation.
    pub renamed: Vec<PortRef>,
}

/// Summary of a removed function, for notifying views and peers.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedFunction {
    pub id: FunctionId,
    pub model: ModelId,
    /// Every connection that was detached, including nested ones.
    pub connections: Vec<ConnectionDescriptor>,
    /// Functions removed along with the submodel.
    pub nested: Vec<FunctionId>,
}

/// The functions of a model that make up its code closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    /// Every child, in insertion order.
    All(Vec<FunctionId>),
    /// The layer chain walked from the model's input function.
    Layers(Vec<FunctionId>),
    /// A layered model without an input function.
    Incomplete,
}

impl Closure {
    pub fn functions(&self) -> &[FunctionId] {
        match self {
            Closure::All(ids) | Closure::Layers(ids) => ids,
            Closure::Incomplete => &[],
        }
    }
}

/// Arena of models, functions and connections.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    models: IndexMap<ModelId, Model>,
    functions: IndexMap<FunctionId, Function>,
    connections: IndexMap<ConnectionId, Connection>,
    root: ModelId,
    next_model: u32,
    next_connection: u32,
    clock: u64,
    duplicate_policy: DuplicatePolicy,
}

impl ModelGraph {
    /// Creates a graph whose root is a new model of `kind`, seeded with the
    /// kind's initial children.
    pub fn new(registry: &Registry, kind: &str) -> Result<Self, CoreError> {
        let mut graph = Self::blank();
        graph.root = graph.create_model(registry, kind, None, true)?;
        Ok(graph)
    }

    /// A graph with no models. Callers must create the root.
    pub(crate) fn blank() -> Self {
        ModelGraph {
            models: IndexMap::new(),
            functions: IndexMap::new(),
            connections: IndexMap::new(),
            root: ModelId(0),
            next_model: 0,
            next_connection: 0,
            clock: 0,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub(crate) fn set_root(&mut self, root: ModelId) {
        self.root = root;
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicate_policy = policy;
    }

    /// Advances the logical clock and returns the new time.
    pub fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn root(&self) -> ModelId {
        self.root
    }

    pub fn model(&self, id: ModelId) -> Result<&Model, CoreError> {
        self.models.get(&id).ok_or(CoreError::ModelNotFound { id })
    }

    pub fn model_mut(&mut self, id: ModelId) -> Result<&mut Model, CoreError> {
        self.models.get_mut(&id).ok_or(CoreError::ModelNotFound { id })
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn function(&self, id: FunctionId) -> Result<&Function, CoreError> {
        self.functions.get(&id).ok_or(CoreError::FunctionNotFound { id })
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Result<&mut Function, CoreError> {
        self.functions
            .get_mut(&id)
            .ok_or(CoreError::FunctionNotFound { id })
    }

    pub fn contains_function(&self, id: FunctionId) -> bool {
        self.functions.contains_key(&id)
    }

    /// Every function of every model.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    /// Child functions of `model` in order.
    pub fn children(&self, model: ModelId) -> Result<Vec<&Function>, CoreError> {
        self.model(model)?
            .children
            .iter()
            .map(|id| self.function(*id))
            .collect()
    }

    pub fn port(&self, port: PortRef) -> Result<&Port, CoreError> {
        self.function(port.function)?
            .port(port.port)
            .ok_or(CoreError::PortNotFound {
                function: port.function,
                port: port.port,
            })
    }

    pub fn port_mut(&mut self, port: PortRef) -> Result<&mut Port, CoreError> {
        self.function_mut(port.function)?
            .port_mut(port.port)
            .ok_or(CoreError::PortNotFound {
                function: port.function,
                port: port.port,
            })
    }

    pub fn connection(&self, id: ConnectionId) -> Result<&Connection, CoreError> {
        self.connections
            .get(&id)
            .ok_or(CoreError::ConnectionNotFound { id })
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// The nested model of a model function.
    pub fn submodel_of(&self, function: FunctionId) -> Result<ModelId, CoreError> {
        self.function(function)?
            .submodel
            .ok_or(CoreError::NoSubmodel { function })
    }

    /// Display name: the submodel's name for model functions, the title
    /// otherwise.
    pub fn display_name(&self, function: FunctionId) -> Result<String, CoreError> {
        let f = self.function(function)?;
        match f.submodel {
            Some(sub) => Ok(self.model(sub)?.name.clone()),
            None => Ok(f.title.clone()),
        }
    }

    /// Models from the root down to `model`, inclusive.
    pub fn model_path(&self, model: ModelId) -> Result<Vec<ModelId>, CoreError> {
        let mut path = vec![model];
        let mut current = self.model(model)?;
        while let Some(owner) = current.parent {
            let parent_model = self.function(owner)?.model;
            if path.contains(&parent_model) {
                break;
            }
            path.push(parent_model);
            current = self.model(parent_model)?;
        }
        path.reverse();
        Ok(path)
    }

    /// Functions feeding `function`'s parameters, without repeats.
    pub fn upstream(&self, function: FunctionId) -> Result<Vec<FunctionId>, CoreError> {
        let f = self.function(function)?;
        let mut seen = Vec::new();
        for param in &f.parameters {
            for c in param.connections() {
                let start = self.connection(*c)?.start.function;
                if !seen.contains(&start) {
                    seen.push(start);
                }
            }
        }
        Ok(seen)
    }

    /// Functions consuming `function`'s return values, without repeats.
    pub fn downstream(&self, function: FunctionId) -> Result<Vec<FunctionId>, CoreError> {
        let f = self.function(function)?;
        let mut seen = Vec::new();
        for ret in &f.return_values {
            for c in ret.connections() {
                let end = self.connection(*c)?.end.function;
                if !seen.contains(&end) {
                    seen.push(end);
                }
            }
        }
        Ok(seen)
    }

    // ------------------------------------------------------------------
    // Models and functions
    // ------------------------------------------------------------------

    /// Creates a model of `kind`. With `seed`, the kind's initial children
    /// are added at their positions.
    pub(crate) fn create_model(
        &mut self,
        registry: &Registry,
        kind: &str,
        parent: Option<FunctionId>,
        seed: bool,
    ) -> Result<ModelId, CoreError> {
        let spec = registry.model(kind)?;
        let id = ModelId(self.next_model);
        self.next_model += 1;

        let mut model = Model::new(id, &spec.kind, &spec.default_name, parent);
        model.layer_root = spec.layer_root.clone();
        self.models.insert(id, model);

        if seed {
            for child in &spec.initial_children {
                let f = self.insert_function(registry, &child.function, id, FunctionId::new(), true)?;
                self.move_function(f, child.x, child.y)?;
            }
        }
        Ok(id)
    }

    /// Adds a new function of `kind` to `model`.
    ///
    /// Model functions get their submodel seeded from the registry. When
    /// `model` is owned by a port-synced composite, the composite's ports
    /// are brought up to date.
    pub fn add_function(
        &mut self,
        registry: &Registry,
        kind: &str,
        model: ModelId,
    ) -> Result<FunctionId, CoreError> {
        let id = self.insert_function(registry, kind, model, FunctionId::new(), true)?;
        self.sync_owner(model)?;
        Ok(id)
    }

    pub(crate) fn insert_function(
        &mut self,
        registry: &Registry,
        kind: &str,
        model: ModelId,
        id: FunctionId,
        seed: bool,
    ) -> Result<FunctionId, CoreError> {
        let spec = registry.function(kind)?;
        if !self.models.contains_key(&model) {
            return Err(CoreError::ModelNotFound { id: model });
        }
        if self.functions.contains_key(&id) {
            return Err(CoreError::MalformedSerialization {
                reason: format!("function {} already exists", id),
            });
        }

        let stamp = self.tick();
        let mut function = Function::from_spec(spec, id, model, stamp);
        if let Some(template) = &spec.code {
            let code = template.render_code(
                &function.parameter_names(),
                &function.return_names(),
                &function.properties,
            );
            function.store_code(code);
        }
        let variables: Vec<(String, DataType)> = function
            .return_values
            .iter()
            .map(|r| (r.name.clone(), r.data_type.clone()))
            .collect();

        self.functions.insert(id, function);
        self.model_mut(model)?.children.push(id);
        for (name, data_type) in variables {
            self.add_variable(model, &name, data_type)?;
        }

        if let Some(sub_kind) = &spec.submodel {
            let sub = self.create_model(registry, sub_kind, Some(id), seed)?;
            self.function_mut(id)?.submodel = Some(sub);
            if seed {
                self.sync_ports(id)?;
            }
        }
        Ok(id)
    }

    /// Removes a function, its connections and, for model functions, the
    /// whole nested model. Variables only this function defined are
    /// dropped from the parent model.
    pub fn remove_function(&mut self, id: FunctionId) -> Result<RemovedFunction, CoreError> {
        let (model, submodel) = {
            let f = self.function(id)?;
            (f.model, f.submodel)
        };

        let mut connections = Vec::new();
        let mut nested = Vec::new();
        if let Some(sub) = submodel {
            self.drop_model(sub, &mut nested, &mut connections)?;
        }
        connections.extend(self.detach_all(id)?);

        let removed = self
            .functions
            .shift_remove(&id)
            .ok_or(CoreError::FunctionNotFound { id })?;
        self.model_mut(model)?.children.retain(|c| *c != id);
        for ret in &removed.return_values {
            self.remove_variable(model, &ret.name)?;
        }
        self.sync_owner(model)?;

        Ok(RemovedFunction {
            id,
            model,
            connections,
            nested,
        })
    }

    fn drop_model(
        &mut self,
        model: ModelId,
        nested: &mut Vec<FunctionId>,
        connections: &mut Vec<ConnectionDescriptor>,
    ) -> Result<(), CoreError> {
        let children = self.model(model)?.children.clone();
        for child in children {
            let submodel = self.function(child)?.submodel;
            if let Some(sub) = submodel {
                self.drop_model(sub, nested, connections)?;
            }
            connections.extend(self.detach_all(child)?);
            self.functions.shift_remove(&child);
            nested.push(child);
        }
        self.models.shift_remove(&model);
        Ok(())
    }

    /// Moves a block. Functions without a block representation are left
    /// untouched.
    pub fn move_function(&mut self, id: FunctionId, x: f64, y: f64) -> Result<(), CoreError> {
        if let Some(block) = self.function_mut(id)?.block_mut() {
            block.x = x;
            block.y = y;
        }
        Ok(())
    }

    /// Replaces the code of a function and advances its edit stamp.
    /// Returns false when the function has no code representation.
    pub fn set_code(&mut self, id: FunctionId, code: &str) -> Result<bool, CoreError> {
        let stamp = self.tick();
        let f = self.function_mut(id)?;
        if !f.store_code(code.to_string()) {
            return Ok(false);
        }
        f.code_edit_stamp = stamp;
        Ok(true)
    }

    /// Code the kind's template produces for the current names and
    /// properties.
    pub fn generated_code(
        &self,
        registry: &Registry,
        id: FunctionId,
    ) -> Result<Option<String>, CoreError> {
        let f = self.function(id)?;
        let spec = registry.function(&f.kind)?;
        Ok(spec.code.as_ref().map(|template| {
            template.render_code(&f.parameter_names(), &f.return_names(), &f.properties)
        }))
    }

    /// Regenerates code from the template and clears `CodeInvalid`.
    /// Free-form kinds keep their code; returns whether the code was reset.
    pub fn reset_code(&mut self, registry: &Registry, id: FunctionId) -> Result<bool, CoreError> {
        let free_form = registry.function(&self.function(id)?.kind)?.free_form_code;
        if free_form {
            return Ok(false);
        }
        let Some(code) = self.generated_code(registry, id)? else {
            return Ok(false);
        };
        let changed = self.function(id)?.code() != code;
        let stamp = if changed { Some(self.tick()) } else { None };

        let f = self.function_mut(id)?;
        if !f.store_code(code) {
            return Ok(false);
        }
        if let Some(stamp) = stamp {
            f.code_edit_stamp = stamp;
        }
        f.warnings.remove(&Warning::CodeInvalid);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connects a return value to a parameter and propagates the return
    /// value's name downstream.
    ///
    /// Checks run in order: endpoint kinds, type compatibility, self loop,
    /// duplicate policy. A refused connection leaves the graph unchanged.
    pub fn connect(&mut self, start: PortRef, end: PortRef) -> Result<Connected, CoreError> {
        let output = self.port(start).map_err(|_| ConnectError::MissingSource)?;
        if output.kind != PortKind::ReturnValue {
            return Err(ConnectError::NotAReturnValue { port: start.port }.into());
        }
        let input = self.port(end).map_err(|_| ConnectError::MissingDestination)?;
        if input.kind != PortKind::Parameter {
            return Err(ConnectError::NotAParameter { port: end.port }.into());
        }
        if !compatible(&output.data_type, &input.data_type) {
            return Err(ConnectError::IncompatibleTypes {
                output: output.data_type.to_string(),
                input: input.data_type.to_string(),
            }
            .into());
        }
        if start.function == end.function {
            return Err(ConnectError::SelfLoop {
                function: start.function,
            }
            .into());
        }
        if self.duplicate_policy == DuplicatePolicy::Reject
            && self
                .connections
                .values()
                .any(|c| c.start == start && c.end == end)
        {
            return Err(ConnectError::Duplicate {
                start: start.port,
                end: end.port,
            }
            .into());
        }

        let id = self.link(start, end)?;
        let renamed = propagate_name(self, start)?;
        Ok(Connected { id, renamed })
    }

    /// The single entry point for connections from any source.
    ///
    /// A live connection only re-runs propagation. A serialized one is
    /// looked up by id and linked as stored: a missing function or port is a
    /// hard error, a type mismatch only flags `IncompatiblePorts`.
    pub fn resolve(&mut self, request: ConnectionRequest) -> Result<Connected, CoreError> {
        match request {
            ConnectionRequest::Live(id) => {
                let start = self.connection(id)?.start;
                let renamed = propagate_name(self, start)?;
                Ok(Connected { id, renamed })
            }
            ConnectionRequest::Serialized(descriptor) => {
                let (start, end) = (descriptor.start(), descriptor.end());
                self.port(start)?;
                self.port(end)?;
                let id = self.link(start, end)?;
                self.check_port(end)?;
                let renamed = propagate_name(self, start)?;
                Ok(Connected { id, renamed })
            }
        }
    }

    fn link(&mut self, start: PortRef, end: PortRef) -> Result<ConnectionId, CoreError> {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id, Connection { id, start, end });
        self.port_mut(start)?.attach(id);
        self.port_mut(end)?.attach(id);
        Ok(id)
    }

    /// Finds the live connection matching a descriptor.
    pub fn find_connection(&self, descriptor: &ConnectionDescriptor) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|c| c.start == descriptor.start() && c.end == descriptor.end())
            .map(|c| c.id)
    }

    /// Removes a connection and detaches it from both ports.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection, CoreError> {
        let connection = self
            .connections
            .shift_remove(&id)
            .ok_or(CoreError::ConnectionNotFound { id })?;
        if let Ok(port) = self.port_mut(connection.start) {
            port.detach(id);
        }
        if let Ok(port) = self.port_mut(connection.end) {
            port.detach(id);
        }
        Ok(connection)
    }

    fn detach_all(&mut self, function: FunctionId) -> Result<Vec<ConnectionDescriptor>, CoreError> {
        let f = self.function(function)?;
        let mut ids: Vec<ConnectionId> = Vec::new();
        for port in f.parameters.iter().chain(f.return_values.iter()) {
            for c in port.connections() {
                if !ids.contains(c) {
                    ids.push(*c);
                }
            }
        }
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            removed.push(self.disconnect(id)?.descriptor());
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Names and variables
    // ------------------------------------------------------------------

    /// Adds a variable unless the name is empty or already present.
    pub fn add_variable(
        &mut self,
        model: ModelId,
        name: &str,
        data_type: DataType,
    ) -> Result<bool, CoreError> {
        if name.is_empty() {
            return Ok(false);
        }
        let m = self.model_mut(model)?;
        if m.variables.contains_key(name) {
            return Ok(false);
        }
        m.variables.insert(name.to_string(), Variable { data_type });
        Ok(true)
    }

    /// Removes a variable unless a child return value still carries the
    /// name.
    pub fn remove_variable(&mut self, model: ModelId, name: &str) -> Result<bool, CoreError> {
        let in_use = self
            .children(model)?
            .iter()
            .any(|f| f.return_values.iter().any(|r| r.name == name));
        if in_use {
            return Ok(false);
        }
        Ok(self.model_mut(model)?.variables.shift_remove(name).is_some())
    }

    /// Sets a port's name and returns the previous one.
    pub fn set_port_name(&mut self, port: PortRef, name: &str) -> Result<String, CoreError> {
        let p = self.port_mut(port)?;
        Ok(std::mem::replace(&mut p.name, name.to_string()))
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Validates and stores a property value, then applies the property's
    /// declared effect. Returns the port whose type changed, if any.
    pub fn set_property(
        &mut self,
        function: FunctionId,
        patch: &PropertyPatch,
    ) -> Result<Option<PortRef>, CoreError> {
        let stamp = self.tick();
        let f = self.function_mut(function)?;
        let effect = f.properties.set(&patch.key, patch.value.clone())?;
        f.code_edit_stamp = stamp;

        let mut affected = None;
        if let Some(effect) = effect {
            let (kind, index, data_type) = effect.port_type_for(&patch.value);
            if let Some(port) = f.ports_mut(kind).get_mut(index) {
                port.data_type = data_type;
                affected = Some(port.port_ref());
            }
        }

        if let Some(port) = affected {
            self.check_port(port)?;
            let model = self.function(function)?.model;
            self.sync_owner(model)?;
        }
        Ok(affected)
    }

    /// Flags `IncompatiblePorts` on a port and its peers when a connection
    /// no longer type-checks, and clears it otherwise.
    fn check_port(&mut self, port: PortRef) -> Result<(), CoreError> {
        let connections: Vec<Connection> = self
            .port(port)?
            .connections()
            .iter()
            .map(|c| self.connection(*c).cloned())
            .collect::<Result<_, _>>()?;

        let mut any_bad = false;
        for c in connections {
            let ok = compatible(&self.port(c.start)?.data_type, &self.port(c.end)?.data_type);
            let peer = if c.start == port { c.end } else { c.start };
            let peer_port = self.port_mut(peer)?;
            if ok {
                peer_port.clear_warning(&Warning::IncompatiblePorts);
            } else {
                peer_port.warn(Warning::IncompatiblePorts);
                any_bad = true;
            }
        }
        let p = self.port_mut(port)?;
        if any_bad {
            p.warn(Warning::IncompatiblePorts);
        } else {
            p.clear_warning(&Warning::IncompatiblePorts);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Composite models
    // ------------------------------------------------------------------

    /// Re-syncs the ports of the model function owning `model`, if any.
    pub(crate) fn sync_owner(&mut self, model: ModelId) -> Result<(), CoreError> {
        let owner = self.model(model)?.parent;
        if let Some(owner) = owner {
            self.sync_ports(owner)?;
        }
        Ok(())
    }

    /// Brings a port-synced composite's ports in line with its submodel:
    /// one parameter per nested input function and one extra return value
    /// per nested output function. Ports that disappear lose their
    /// connections. Returns false for functions without port sync.
    pub fn sync_ports(&mut self, function: FunctionId) -> Result<bool, CoreError> {
        let f = self.function(function)?;
        let Some(PortSync::NestedIo { input, output }) = f.port_sync.clone() else {
            return Ok(false);
        };
        let fixed = f.fixed_return_values;
        let sub = f.submodel.ok_or(CoreError::NoSubmodel { function })?;

        let mut in_types = Vec::new();
        let mut out_types = Vec::new();
        for child in self.children(sub)? {
            if child.kind == input {
                in_types.push(
                    child
                        .return_values
                        .first()
                        .map(|p| p.data_type.clone())
                        .unwrap_or(DataType::None),
                );
            } else if child.kind == output {
                out_types.push(
                    child
                        .parameters
                        .first()
                        .map(|p| p.data_type.clone())
                        .unwrap_or(DataType::None),
                );
            }
        }

        let f = self.function(function)?;
        let mut stale: Vec<ConnectionId> = Vec::new();
        for p in f.parameters.iter().skip(in_types.len()) {
            stale.extend_from_slice(p.connections());
        }
        for p in f.return_values.iter().skip(fixed + out_types.len()) {
            stale.extend_from_slice(p.connections());
        }
        for id in stale {
            if self.connections.contains_key(&id) {
                self.disconnect(id)?;
            }
        }

        let f = self.function_mut(function)?;
        resize_ports(&mut f.parameters, PortKind::Parameter, function, &in_types);
        let mut rets: Vec<Port> = f.return_values.split_off(fixed.min(f.return_values.len()));
        resize_ports(&mut rets, PortKind::ReturnValue, function, &out_types);
        f.return_values.extend(rets);
        Ok(true)
    }

    /// The code closure of a model: every child, or for layered models the
    /// chain walked from the first input function along each function's
    /// first outgoing connection.
    pub fn closure(&self, model: ModelId) -> Result<Closure, CoreError> {
        let m = self.model(model)?;
        let Some(root_kind) = m.layer_root.as_deref() else {
            return Ok(Closure::All(m.children.clone()));
        };
        let Some(start) = m
            .children
            .iter()
            .copied()
            .find(|c| self.functions.get(c).is_some_and(|f| f.kind == root_kind))
        else {
            return Ok(Closure::Incomplete);
        };

        let mut layers = vec![start];
        let mut visited: HashSet<FunctionId> = HashSet::from([start]);
        let mut current = start;
        loop {
            let next = self
                .function(current)?
                .return_values
                .iter()
                .find_map(|r| r.connections().first())
                .and_then(|c| self.connections.get(c))
                .map(|c| c.end.function)
                .filter(|f| m.contains(*f));
            match next {
                Some(n) if visited.insert(n) => {
                    layers.push(n);
                    current = n;
                }
                _ => break,
            }
        }
        Ok(Closure::Layers(layers))
    }
}

/// Grows or shrinks `ports` to one per entry of `types`, updating types in
/// place. New ports are unnamed.
fn resize_ports(ports: &mut Vec<Port>, kind: PortKind, owner: FunctionId, types: &[DataType]) {
    ports.truncate(types.len());
    for (port, data_type) in ports.iter_mut().zip(types) {
        port.data_type = data_type.clone();
    }
    for data_type in types.iter().skip(ports.len()) {
        ports.push(Port::new(kind, owner, "", data_type.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{
        COMPOSITE_NN, CUSTOM, INPUT, OUTPUT, PIPELINE_MODEL, TRAIN_TEST_SPLIT, VALIDATION,
    };
    use serde_json::json;

    fn pipeline() -> (Registry, ModelGraph) {
        let registry = Registry::with_builtins();
        let graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        (registry, graph)
    }

    fn ret(graph: &ModelGraph, f: FunctionId, i: usize) -> PortRef {
        graph.function(f).unwrap().return_values[i].port_ref()
    }

    fn param(graph: &ModelGraph, f: FunctionId, i: usize) -> PortRef {
        graph.function(f).unwrap().parameters[i].port_ref()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    #[test]
    fn new_functions_get_template_code_and_variables() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let v = graph.add_function(&registry, VALIDATION, root).unwrap();

        let f = graph.function(v).unwrap();
        assert_eq!(f.code(), "loss, accuracy = model.evaluate(test_data)\nprint(loss, accuracy)");
        assert!(graph.model(root).unwrap().variable("loss, accuracy").is_some());
        assert_eq!(graph.model(root).unwrap().children, vec![v]);
    }

    #[test]
    fn composite_seeds_submodel_and_syncs_ports() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let nn = graph.add_function(&registry, COMPOSITE_NN, root).unwrap();

        let sub = graph.submodel_of(nn).unwrap();
        let children = graph.children(sub).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind, INPUT);
        assert_eq!(children[0].block().map(|b| (b.x, b.y)), Some((100.0, 100.0)));
        assert_eq!(graph.display_name(nn).unwrap(), "Composite Model");
        assert_eq!(graph.model_path(sub).unwrap(), vec![root, sub]);

        // one nested Input -> one parameter; return value 0 is fixed
        let f = graph.function(nn).unwrap();
        assert_eq!(f.parameters.len(), 1);
        assert_eq!(f.return_values.len(), 1);

        graph.add_function(&registry, OUTPUT, sub).unwrap();
        graph.add_function(&registry, INPUT, sub).unwrap();
        let f = graph.function(nn).unwrap();
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.return_values.len(), 2);
        assert_eq!(f.return_values[0].name, "model");
    }

    #[test]
    fn unknown_kinds_are_hard_errors() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        assert!(matches!(
            graph.add_function(&registry, "nope", root),
            Err(CoreError::UnknownFunctionKind { .. })
        ));
        assert!(matches!(
            ModelGraph::new(&registry, "nope"),
            Err(CoreError::UnknownModelKind { .. })
        ));
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    #[test]
    fn connect_attaches_both_ends() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let b = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();

        let connected = graph.connect(ret(&graph, a, 0), param(&graph, b, 0)).unwrap();
        assert_eq!(graph.port(ret(&graph, a, 0)).unwrap().connections(), &[connected.id]);
        assert_eq!(graph.port(param(&graph, b, 0)).unwrap().connections(), &[connected.id]);
        assert_eq!(graph.upstream(b).unwrap(), vec![a]);
        assert_eq!(graph.downstream(a).unwrap(), vec![b]);
    }

    #[test]
    fn self_loops_are_refused_without_side_effects() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();

        let err = graph.connect(ret(&graph, a, 0), param(&graph, a, 0)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Connect(ConnectError::SelfLoop { function }) if function == a
        ));
        assert_eq!(graph.connections().count(), 0);
        assert!(!graph.port(ret(&graph, a, 0)).unwrap().is_connected());
    }

    #[test]
    fn wrong_direction_and_types_are_refused() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let split = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let val = graph.add_function(&registry, VALIDATION, root).unwrap();

        assert!(matches!(
            graph.connect(param(&graph, val, 0), param(&graph, split, 0)),
            Err(CoreError::Connect(ConnectError::NotAReturnValue { .. }))
        ));
        // ARRAY into MODEL
        assert!(matches!(
            graph.connect(ret(&graph, split, 0), param(&graph, val, 0)),
            Err(CoreError::Connect(ConnectError::IncompatibleTypes { .. }))
        ));
    }

    #[test]
    fn duplicate_policy_controls_parallel_edges() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let b = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let (s, e) = (ret(&graph, a, 0), param(&graph, b, 0));

        graph.connect(s, e).unwrap();
        graph.connect(s, e).unwrap();
        assert_eq!(graph.connections().count(), 2);

        let mut strict = graph.clone().with_policy(DuplicatePolicy::Reject);
        assert!(matches!(
            strict.connect(s, e),
            Err(CoreError::Connect(ConnectError::Duplicate { .. }))
        ));
    }

    #[test]
    fn serialized_requests_resolve_by_id() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let b = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let descriptor = ConnectionDescriptor {
            param_func_id: b,
            param_id: param(&graph, b, 0).port,
            return_value_id: ret(&graph, a, 1).port,
            return_value_func_id: a,
        };

        let connected = graph.resolve(descriptor.into()).unwrap();
        assert_eq!(graph.find_connection(&descriptor), Some(connected.id));

        let missing = ConnectionDescriptor {
            return_value_func_id: FunctionId::new(),
            ..descriptor
        };
        assert!(matches!(
            graph.resolve(missing.into()),
            Err(CoreError::FunctionNotFound { .. })
        ));
    }

    // ------------------------------------------------------------------
    // Removal and variables
    // ------------------------------------------------------------------

    #[test]
    fn remove_function_detaches_connections_and_variables() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let b = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        graph.set_port_name(ret(&graph, a, 0), "train").unwrap();
        graph.set_port_name(ret(&graph, b, 0), "b_train").unwrap();
        graph.set_port_name(ret(&graph, b, 1), "b_test").unwrap();
        graph.add_variable(root, "train", DataType::tensor()).unwrap();
        graph.connect(ret(&graph, a, 0), param(&graph, b, 0)).unwrap();

        let removed = graph.remove_function(a).unwrap();
        assert_eq!(removed.connections.len(), 1);
        assert_eq!(graph.connections().count(), 0);
        assert!(!graph.port(param(&graph, b, 0)).unwrap().is_connected());
        assert!(graph.model(root).unwrap().variable("train").is_none());
        assert_eq!(graph.model(root).unwrap().children, vec![b]);
    }

    #[test]
    fn removing_a_composite_drops_its_submodel() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let nn = graph.add_function(&registry, COMPOSITE_NN, root).unwrap();
        let sub = graph.submodel_of(nn).unwrap();
        let input = graph.model(sub).unwrap().children[0];

        let removed = graph.remove_function(nn).unwrap();
        assert_eq!(removed.nested, vec![input]);
        assert!(graph.model(sub).is_err());
        assert!(!graph.contains_function(input));
        assert!(graph.model(root).unwrap().variable("model").is_none());
    }

    #[test]
    fn variables_stay_while_a_return_value_uses_them() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        graph.set_port_name(ret(&graph, a, 1), "test").unwrap();

        assert!(graph.add_variable(root, "test", DataType::tensor()).unwrap());
        assert!(!graph.add_variable(root, "test", DataType::tensor()).unwrap());
        assert!(!graph.add_variable(root, "", DataType::tensor()).unwrap());
        assert!(!graph.remove_variable(root, "test").unwrap());

        graph.set_port_name(ret(&graph, a, 1), "held_out").unwrap();
        assert!(graph.remove_variable(root, "test").unwrap());
        let names: Vec<&String> = graph.model(root).unwrap().variables().map(|(n, _)| n).collect();
        assert!(names.is_empty());
    }

    // ------------------------------------------------------------------
    // Properties and code
    // ------------------------------------------------------------------

    #[test]
    fn select_property_retypes_the_input_port() {
        let (registry, mut graph) = pipeline();
        let nn = graph.add_function(&registry, COMPOSITE_NN, graph.root()).unwrap();
        let sub = graph.submodel_of(nn).unwrap();
        let input = graph.model(sub).unwrap().children[0];

        let port = graph
            .set_property(input, &PropertyPatch::new("type", json!("Tensor")))
            .unwrap();
        assert_eq!(port, Some(ret(&graph, input, 0)));
        assert_eq!(
            graph.port(ret(&graph, input, 0)).unwrap().data_type,
            DataType::tensor()
        );
        // the owning composite's parameter follows the nested input
        assert_eq!(graph.function(nn).unwrap().parameters[0].data_type, DataType::tensor());

        assert!(matches!(
            graph.set_property(input, &PropertyPatch::new("type", json!("Graph"))),
            Err(CoreError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn reset_regenerates_unless_free_form() {
        let (registry, mut graph) = pipeline();
        let root = graph.root();
        let v = graph.add_function(&registry, VALIDATION, root).unwrap();
        let c = graph.add_function(&registry, CUSTOM, root).unwrap();

        graph.set_code(v, "garbage").unwrap();
        graph.function_mut(v).unwrap().warnings.add(Warning::CodeInvalid);
        assert!(graph.reset_code(&registry, v).unwrap());
        assert!(graph.function(v).unwrap().code().starts_with("loss, accuracy = "));
        assert!(!graph.function(v).unwrap().warnings.contains(&Warning::CodeInvalid));

        graph.set_code(c, "def f():\n    pass").unwrap();
        assert!(!graph.reset_code(&registry, c).unwrap());
        assert_eq!(graph.function(c).unwrap().code(), "def f():\n    pass");
    }

    #[test]
    fn set_code_advances_the_edit_stamp() {
        let (registry, mut graph) = pipeline();
        let v = graph.add_function(&registry, VALIDATION, graph.root()).unwrap();
        let before = graph.function(v).unwrap().code_edit_stamp;
        graph.set_code(v, "x = 1").unwrap();
        assert!(graph.function(v).unwrap().code_edit_stamp > before);
    }

    // ------------------------------------------------------------------
    // Closures
    // ------------------------------------------------------------------

    #[test]
    fn layered_closure_walks_first_connections() {
        let (registry, mut graph) = pipeline();
        let nn = graph.add_function(&registry, COMPOSITE_NN, graph.root()).unwrap();
        let sub = graph.submodel_of(nn).unwrap();
        let input = graph.model(sub).unwrap().children[0];
        let layer = graph.add_function(&registry, crate::builtin::LAYER, sub).unwrap();
        let stray = graph.add_function(&registry, crate::builtin::LAYER, sub).unwrap();
        graph
            .set_property(input, &PropertyPatch::new("type", json!("Tensor")))
            .unwrap();
        graph.connect(ret(&graph, input, 0), param(&graph, layer, 0)).unwrap();

        assert_eq!(graph.closure(sub).unwrap(), Closure::Layers(vec![input, layer]));
        assert!(!graph.closure(sub).unwrap().functions().contains(&stray));

        graph.remove_function(input).unwrap();
        assert_eq!(graph.closure(sub).unwrap(), Closure::Incomplete);

        let root = graph.root();
        assert_eq!(graph.closure(root).unwrap(), Closure::All(vec![nn]));
    }
}

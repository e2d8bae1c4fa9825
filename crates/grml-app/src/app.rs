//! Application: the coordinator between the views, the model graph and the
//! message handlers.
//!
//! Every model mutation goes through [`Application`]. Each operation
//! changes the graph, refreshes both editors and raises the notification
//! events peers and the host need to follow along. Events are collected in
//! an outbox that the [`EventBus`](crate::EventBus) drains after every
//! delivery.

use std::collections::HashMap;

use grml_core::builtin::{CUSTOM, PIPELINE_MODEL};
use grml_core::connection::{ConnectionDescriptor, ConnectionRequest};
use grml_core::graph::{Connected, ModelGraph, RemovedFunction};
use grml_core::id::{FunctionId, ModelId, PortId};
use grml_core::port::{PortKind, PortRef};
use grml_core::propagate::propagate_name;
use grml_core::property::PropertyPatch;
use grml_core::registry::Registry;
use grml_core::representation::RepresentationKind;
use grml_core::serialize::{
    connection_descriptors, function_connection_descriptors, FunctionSerialization,
    ModelSerialization,
};
use grml_core::warning::Warning;
use grml_view::{
    infer_from_code, BrushOutcome, Editor, GraphicalEditor, Inference, NameChangeKind, PanelEdit,
    Selection, SelectionChange, SelectionMode, TextEditor, ViewError,
};
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::event::{Event, LogLevel, OpenTarget, ToolbarCommand};

/// Outcome of asking a function for its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRequest {
    /// `execute-code` events were raised for the function and its upstream.
    Requested,
    /// A parameter is unconnected or upstream has no data.
    NoData,
}

pub struct Application {
    registry: Registry,
    graph: ModelGraph,
    config: AppConfig,
    active_model: ModelId,
    representation: RepresentationKind,
    selection: Selection,
    breadcrumb: Breadcrumb,
    graphical: GraphicalEditor,
    text: TextEditor,
    events: Vec<Event>,
    suppressed: bool,
}

impl Application {
    /// Creates an application with the built-in kinds and an empty pipeline.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        Self::with_registry(Registry::with_builtins(), PIPELINE_MODEL, config)
    }

    pub fn with_registry(
        registry: Registry,
        model_kind: &str,
        config: AppConfig,
    ) -> Result<Self, AppError> {
        let graph = ModelGraph::new(&registry, model_kind)?.with_policy(config.duplicate_policy);
        let root = graph.root();
        let mut app = Application {
            registry,
            graph,
            config,
            active_model: root,
            representation: RepresentationKind::Block,
            selection: Selection::new(),
            breadcrumb: Breadcrumb::new(root),
            graphical: GraphicalEditor::new(),
            text: TextEditor::new(config.text_ordering),
            events: Vec::new(),
            suppressed: false,
        };
        app.graphical.load_library(&app.registry, model_kind)?;
        app.refresh_editors()?;
        Ok(app)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn active_model(&self) -> ModelId {
        self.active_model
    }

    pub fn representation(&self) -> RepresentationKind {
        self.representation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn breadcrumb(&self) -> &Breadcrumb {
        &self.breadcrumb
    }

    pub fn graphical(&self) -> &GraphicalEditor {
        &self.graphical
    }

    /// View-only state such as zoom and brushing.
    pub fn graphical_mut(&mut self) -> &mut GraphicalEditor {
        &mut self.graphical
    }

    pub fn text(&self) -> &TextEditor {
        &self.text
    }

    /// The editor of the active representation.
    pub fn active_editor(&self) -> &dyn Editor {
        match self.representation {
            RepresentationKind::Block => &self.graphical,
            RepresentationKind::Code => &self.text,
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Queues an event unless emission is suppressed.
    pub fn emit(&mut self, event: Event) {
        if self.suppressed {
            tracing::trace!(command = event.command(), "event suppressed");
            return;
        }
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Runs `f` without raising events, e.g. to apply changes that came
    /// from a peer.
    pub fn suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.suppressed, true);
        let result = f(self);
        self.suppressed = previous;
        result
    }

    pub fn ready(&mut self) {
        self.emit(Event::AppReady);
    }

    fn log(&mut self, level: LogLevel, message: String) {
        tracing::info!(?level, "{message}");
        self.emit(Event::log(level, message));
    }

    // ------------------------------------------------------------------
    // Models and navigation
    // ------------------------------------------------------------------

    /// Opens a model in both editors. Targets that do not resolve open the
    /// root model.
    pub fn open_submodel(&mut self, target: OpenTarget) -> Result<ModelId, AppError> {
        self.selection.clear();
        let path = match target {
            OpenTarget::Path(path) => self.is_valid_path(&path).then_some(path),
            OpenTarget::Function(id) => self
                .graph
                .function(id)
                .ok()
                .and_then(|f| f.submodel)
                .and_then(|sub| self.graph.model_path(sub).ok()),
            OpenTarget::Root => None,
        };
        let path = path.unwrap_or_else(|| vec![self.graph.root()]);
        self.breadcrumb.set(path);
        self.active_model = self.breadcrumb.current();

        let kind = self.graph.model(self.active_model)?.kind.clone();
        self.graphical.load_library(&self.registry, &kind)?;
        self.bind_panels(None)?;
        self.refresh_editors()?;
        tracing::debug!(model = %self.active_model, depth = self.breadcrumb.path().len(), "opened model");
        Ok(self.active_model)
    }

    fn is_valid_path(&self, path: &[ModelId]) -> bool {
        match path.last() {
            Some(last) => self
                .graph
                .model_path(*last)
                .map(|p| p == path)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Replaces the whole model.
    pub fn on_new_model(&mut self, graph: ModelGraph) -> Result<(), AppError> {
        self.install(graph)?;
        self.refresh_editors()?;
        let model = Box::new(self.graph.serialize()?);
        self.emit(Event::ModelLoaded { model });
        Ok(())
    }

    /// Loads a serialized model: functions first, then every connection
    /// through [`Application::add_connection`].
    pub fn load_model(&mut self, serialized: &ModelSerialization) -> Result<(), AppError> {
        let graph = ModelGraph::deserialize(&self.registry, serialized)?;
        let descriptors = connection_descriptors(&graph, serialized)?;
        self.install(graph)?;
        self.suppressed(|app| {
            descriptors
                .into_iter()
                .try_for_each(|d| app.add_connection(d.into()).map(|_| ()))
        })?;
        self.refresh_editors()?;
        tracing::info!(
            functions = self.graph.functions().count(),
            connections = self.graph.connections().count(),
            "model loaded"
        );
        let model = Box::new(self.graph.serialize()?);
        self.emit(Event::ModelLoaded { model });
        Ok(())
    }

    pub fn load_model_json(&mut self, json: &str) -> Result<(), AppError> {
        let serialized: ModelSerialization = serde_json::from_str(json)?;
        self.load_model(&serialized)
    }

    fn install(&mut self, mut graph: ModelGraph) -> Result<(), AppError> {
        graph.set_duplicate_policy(self.config.duplicate_policy);
        let root = graph.root();
        let kind = graph.model(root)?.kind.clone();
        self.graph = graph;
        self.active_model = root;
        self.breadcrumb.reset(root);
        self.selection.clear();
        self.graphical.load_library(&self.registry, &kind)?;
        self.bind_panels(None)?;
        Ok(())
    }

    pub fn serialize_model(&self) -> Result<ModelSerialization, AppError> {
        Ok(self.graph.serialize()?)
    }

    /// Synchronizes both editors with the active model.
    pub fn refresh_editors(&mut self) -> Result<(), AppError> {
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains_function(*id));
        self.graphical
            .update(&self.graph, self.active_model, &self.selection)?;
        self.text.update(&self.graph, self.active_model, &self.selection)?;
        Ok(())
    }

    /// Shows the other representation. Returns the one now active.
    pub fn switch_representation(&mut self) -> Result<RepresentationKind, AppError> {
        self.representation = match self.representation {
            RepresentationKind::Block => RepresentationKind::Code,
            RepresentationKind::Code => RepresentationKind::Block,
        };
        self.bind_panels(self.selection.last())?;
        self.refresh_editors()?;
        Ok(self.representation)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Applies a click on a function, or on the background for `None`.
    /// A function this instance does not hold leaves the selection as is.
    pub fn on_function_select(
        &mut self,
        target: Option<FunctionId>,
        mode: SelectionMode,
    ) -> Result<SelectionChange, AppError> {
        if let Some(id) = target {
            if !self.graph.contains_function(id) {
                tracing::debug!(%id, "ignoring selection of an unknown function");
                return Ok(SelectionChange::Unchanged);
            }
        }
        let change = self.selection.apply(target, mode);
        if change.changed() {
            self.selection_updated()?;
        }
        Ok(change)
    }

    /// Replaces the selection. Unknown ids are dropped.
    pub fn set_functions_selected(&mut self, ids: &[FunctionId]) -> Result<(), AppError> {
        let graph = &self.graph;
        self.selection
            .set(ids.iter().copied().filter(|id| graph.contains_function(*id)));
        self.selection_updated()
    }

    fn selection_updated(&mut self) -> Result<(), AppError> {
        self.bind_panels(self.selection.last())?;
        self.refresh_editors()?;
        self.emit(Event::SelectionChanged {
            ids: self.selection.ids().to_vec(),
        });
        Ok(())
    }

    fn bind_panels(&mut self, function: Option<FunctionId>) -> Result<(), AppError> {
        self.graphical.on_select(&self.graph, function)?;
        self.text.on_select(&self.graph, function)?;
        Ok(())
    }

    /// Finishes a brush gesture in the graphical editor. A click clears the
    /// selection; a brushed rectangle adds every block inside it.
    pub fn end_brush(&mut self, x: f64, y: f64) -> Result<Option<BrushOutcome>, AppError> {
        let outcome = self.graphical.end_brush(x, y);
        match &outcome {
            Some(BrushOutcome::Click) => {
                self.on_function_select(None, SelectionMode::Switch)?;
            }
            Some(BrushOutcome::Brushed(ids)) => {
                for id in ids.clone() {
                    self.on_function_select(Some(id), SelectionMode::Add)?;
                }
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Removes every selected function that may be removed.
    pub fn on_delete(&mut self) -> Result<Vec<FunctionId>, AppError> {
        let targets: Vec<FunctionId> = self
            .selection
            .ids()
            .iter()
            .copied()
            .filter(|id| self.graph.function(*id).map(|f| f.removable).unwrap_or(false))
            .collect();
        let mut removed = Vec::new();
        for id in targets {
            // nested functions go along with their model function
            if self.graph.contains_function(id) {
                self.remove_function(id)?;
                removed.push(id);
            }
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Adds a function of `kind` to the active model and selects it.
    pub fn add_function(&mut self, kind: &str) -> Result<FunctionId, AppError> {
        let id = self
            .graph
            .add_function(&self.registry, kind, self.active_model)?;
        self.refresh_editors()?;
        tracing::info!(%id, kind, "function added");
        let function = Box::new(self.graph.serialize_function(id)?);
        self.emit(Event::AddFunction { function });
        self.on_function_select(Some(id), SelectionMode::Switch)?;
        Ok(id)
    }

    /// Adds a serialized function, with its incoming connections, to the
    /// model named by its `parentFunctionId` or the active model.
    pub fn add_serialized_function(
        &mut self,
        serialized: &FunctionSerialization,
    ) -> Result<FunctionId, AppError> {
        let model = self.graph.target_model(serialized, self.active_model);
        let id = self
            .graph
            .insert_serialized(&self.registry, model, serialized)?;
        let mut descriptors = function_connection_descriptors(&self.graph, serialized)?;
        if let Some(nested) = &serialized.model {
            descriptors.extend(connection_descriptors(&self.graph, nested)?);
        }
        for descriptor in descriptors {
            self.graph.resolve(descriptor.into())?;
        }
        self.refresh_editors()?;
        let function = Box::new(self.graph.serialize_function(id)?);
        self.emit(Event::AddFunction { function });
        self.on_function_select(Some(id), SelectionMode::Switch)?;
        Ok(id)
    }

    pub fn remove_function(&mut self, id: FunctionId) -> Result<RemovedFunction, AppError> {
        let removed = self.graph.remove_function(id)?;
        if self.graph.model(self.active_model).is_err() {
            self.open_submodel(OpenTarget::Root)?;
        }
        self.refresh_editors()?;
        tracing::info!(
            %id,
            connections = removed.connections.len(),
            nested = removed.nested.len(),
            "function removed"
        );
        self.emit(Event::Remove { function: id });
        Ok(removed)
    }

    /// Applies a serialized function to the existing function with the same
    /// id: names, properties, code and block position.
    pub fn update_function(&mut self, serialized: &FunctionSerialization) -> Result<(), AppError> {
        let id = serialized.uuid;
        self.graph.apply_serialized(id, serialized)?;
        if let Some(block) = &serialized.representation.block {
            self.graph
                .move_function(id, block.position.x, block.position.y)?;
        }
        self.function_changed(id)
    }

    pub fn move_block(&mut self, id: FunctionId, x: f64, y: f64) -> Result<(), AppError> {
        self.graph.move_function(id, x, y)?;
        self.function_changed(id)
    }

    fn function_changed(&mut self, id: FunctionId) -> Result<(), AppError> {
        self.refresh_editors()?;
        let function = Box::new(self.graph.serialize_function(id)?);
        self.emit(Event::FunctionChanged { function });
        Ok(())
    }

    /// Validates and stores property values. Port type effects are applied
    /// by the graph; the code is regenerated afterwards.
    pub fn set_properties(
        &mut self,
        function: FunctionId,
        properties: &IndexMap<String, Value>,
    ) -> Result<(), AppError> {
        for (key, value) in properties {
            let patch = PropertyPatch::new(key, value.clone());
            if let Some(port) = self.graph.set_property(function, &patch)? {
                tracing::debug!(%function, port = %port.port, key, "port type changed");
            }
        }
        self.graph.reset_code(&self.registry, function)?;
        self.refresh_editors()?;
        let properties = self.graph.function(function)?.properties.values();
        self.emit(Event::PropertiesChanged {
            function,
            properties,
        });
        Ok(())
    }

    /// Turns an edit of the active editor's property panel into a model
    /// change.
    pub fn edit_panel(&mut self, key: &str, value: Value) -> Result<(), AppError> {
        let edit = self.active_editor().panel().edit(key, value)?;
        self.apply_panel_edit(edit)
    }

    pub fn apply_panel_edit(&mut self, edit: PanelEdit) -> Result<(), AppError> {
        match edit {
            PanelEdit::Property { function, patch } => {
                let mut properties = IndexMap::new();
                properties.insert(patch.key, patch.value);
                self.set_properties(function, &properties)
            }
            PanelEdit::Rename {
                kind,
                port,
                name,
                parent,
            } => self
                .rename_variable(kind, port, &name, Some(parent))
                .map(|_| ()),
        }
    }

    /// Regenerates the code of every selected function.
    pub fn reset_selected_functions(&mut self) -> Result<Vec<FunctionId>, AppError> {
        let mut reset = Vec::new();
        for id in self.selection.ids().to_vec() {
            if self.graph.reset_code(&self.registry, id)? {
                reset.push(id);
            }
        }
        for id in &reset {
            self.function_changed(*id)?;
        }
        Ok(reset)
    }

    pub fn toolbar(&mut self, command: ToolbarCommand) -> Result<(), AppError> {
        match command {
            ToolbarCommand::Add => self.add_function(CUSTOM).map(|_| ()),
            ToolbarCommand::Reset => self.reset_selected_functions().map(|_| ()),
        }
    }

    /// Stores edited snippet code and reads names and connections back from
    /// it.
    pub fn commit_code(&mut self, function: FunctionId, code: &str) -> Result<Inference, AppError> {
        if !self.graph.set_code(function, code)? {
            return Err(ViewError::NoCodeRepresentation { function }.into());
        }
        let (previous, next) = self.text.neighbours(function);
        let inference = infer_from_code(&mut self.graph, &self.registry, function, previous, next)?;

        let mut touched: Vec<FunctionId> = inference.renamed.iter().map(|p| p.function).collect();
        for change in &inference.names {
            if change.kind == NameChangeKind::ReturnValue {
                touched.extend(
                    propagate_name(&mut self.graph, change.port)?
                        .into_iter()
                        .map(|p| p.function),
                );
            }
        }
        touched.sort();
        touched.dedup();
        for id in touched.into_iter().filter(|id| *id != function) {
            self.graph.reset_code(&self.registry, id)?;
        }

        self.refresh_editors()?;
        for descriptor in &inference.connections {
            self.connection_added(*descriptor)?;
        }
        self.function_changed(function)?;
        Ok(inference)
    }

    // ------------------------------------------------------------------
    // Connections and names
    // ------------------------------------------------------------------

    /// Resolves a live or serialized connection and propagates names.
    pub fn add_connection(&mut self, request: ConnectionRequest) -> Result<Connected, AppError> {
        let connected = self.graph.resolve(request)?;
        self.after_connect(&connected)?;
        Ok(connected)
    }

    /// Connects two ports directly.
    pub fn connect_ports(&mut self, start: PortRef, end: PortRef) -> Result<Connected, AppError> {
        let connected = self.graph.connect(start, end)?;
        self.after_connect(&connected)?;
        Ok(connected)
    }

    /// Starts dragging a wire in the graphical editor.
    pub fn begin_connection(&mut self, start: PortRef) {
        self.graphical.begin_connection(start);
    }

    /// Drops the dragged wire on `end`.
    pub fn drop_connection(&mut self, end: PortRef) -> Result<Connected, AppError> {
        let (start, end) = self.graphical.drop_connection(&self.graph, end)?;
        self.connect_ports(start, end)
    }

    fn after_connect(&mut self, connected: &Connected) -> Result<(), AppError> {
        let descriptor = self.graph.connection(connected.id)?.descriptor();
        let mut owners: Vec<FunctionId> = connected.renamed.iter().map(|p| p.function).collect();
        owners.sort();
        owners.dedup();
        for id in owners {
            self.graph.reset_code(&self.registry, id)?;
        }
        self.refresh_editors()?;
        self.connection_added(descriptor)
    }

    fn connection_added(&mut self, descriptor: ConnectionDescriptor) -> Result<(), AppError> {
        let start = descriptor.return_value_func_id;
        self.graphical.update_connections(&self.graph, start)?;
        self.text.update_connections(&self.graph, start)?;
        tracing::debug!(
            from = %start,
            to = %descriptor.param_func_id,
            "connection added"
        );
        self.emit(Event::PortConnected {
            connection: descriptor,
        });
        Ok(())
    }

    /// Renames a port and its variable. Return value renames also reach
    /// every downstream parameter; a kernel that already computed the old
    /// variable gets a rename snippet.
    pub fn rename_variable(
        &mut self,
        kind: NameChangeKind,
        port: PortId,
        name: &str,
        parent: Option<FunctionId>,
    ) -> Result<Vec<PortRef>, AppError> {
        if kind == NameChangeKind::Function {
            return Err(AppError::NotRenamable);
        }
        let owns = |graph: &ModelGraph, f: FunctionId| {
            graph.function(f).map(|f| f.port(port).is_some()).unwrap_or(false)
        };
        let owner = match parent.filter(|p| owns(&self.graph, *p)) {
            Some(owner) => owner,
            None => self
                .graph
                .functions()
                .find(|f| f.port(port).is_some())
                .map(|f| f.id)
                .ok_or(AppError::UnknownPort { port })?,
        };

        let port_ref = PortRef::new(owner, port);
        let model = self.graph.function(owner)?.model;
        let (port_kind, data_type) = {
            let p = self.graph.port(port_ref)?;
            (p.kind, p.data_type.clone())
        };
        let old = self.graph.set_port_name(port_ref, name)?;
        if !old.is_empty() && old != name {
            self.graph.remove_variable(model, &old)?;
        }
        self.graph.add_variable(model, name, data_type)?;

        let stamp = self.graph.tick();
        let f = self.graph.function_mut(owner)?;
        f.code_edit_stamp = stamp;
        let computed = f.computed_stamp > 0;

        let mut renamed = Vec::new();
        if port_kind == PortKind::ReturnValue {
            if !old.is_empty() && old != name && computed {
                self.emit(Event::ExecuteCode {
                    code: format!("import copy\n{name} = copy.deepcopy({old})\ndel {old}"),
                    ret_val_code: String::new(),
                    function: None,
                    correlation: None,
                    stamp,
                });
            }
            renamed = propagate_name(&mut self.graph, port_ref)?;
            if !old.is_empty() && old != name {
                self.graph.remove_variable(model, &old)?;
            }
        }

        let mut owners: Vec<FunctionId> = renamed.iter().map(|p| p.function).collect();
        owners.push(owner);
        owners.sort();
        owners.dedup();
        for id in owners {
            self.graph.reset_code(&self.registry, id)?;
        }
        self.refresh_editors()?;
        tracing::debug!(%owner, %port, old, name, cascaded = renamed.len(), "variable renamed");
        self.emit(Event::NameChange {
            kind,
            port,
            name: name.to_string(),
            parent: Some(owner),
        });
        Ok(renamed)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Runs every function of the active model, or the selected ones.
    pub fn execute_functions(&mut self, all: bool) -> Result<(), AppError> {
        let targets = if all {
            self.graph.model(self.active_model)?.children.clone()
        } else {
            self.selection.ids().to_vec()
        };
        for id in targets {
            self.execute(id, !all)?;
        }
        Ok(())
    }

    /// Requests the data of an executable function under a fresh
    /// correlation id. Returns `None` for functions that do not execute.
    pub fn execute(
        &mut self,
        function: FunctionId,
        log_feedback: bool,
    ) -> Result<Option<DataRequest>, AppError> {
        if !self.graph.function(function)?.executable {
            if log_feedback {
                let name = self.graph.display_name(function)?;
                self.log(LogLevel::Info, format!("Function {name} not executable."));
            }
            return Ok(None);
        }
        let correlation = Uuid::new_v4();
        self.request_data(function, correlation).map(Some)
    }

    /// Requests the data of `function`: upstream functions first, then the
    /// function itself, all under `correlation`.
    pub fn request_data(
        &mut self,
        function: FunctionId,
        correlation: Uuid,
    ) -> Result<DataRequest, AppError> {
        let mut visited = HashMap::new();
        self.request_data_inner(function, correlation, &mut visited)
    }

    /// `visited` holds the outcome of every function already asked under
    /// this correlation. A function still waiting on its own upstream counts
    /// as having no data.
    fn request_data_inner(
        &mut self,
        function: FunctionId,
        correlation: Uuid,
        visited: &mut HashMap<FunctionId, DataRequest>,
    ) -> Result<DataRequest, AppError> {
        if let Some(outcome) = visited.get(&function) {
            return Ok(*outcome);
        }
        visited.insert(function, DataRequest::NoData);

        let mut sources = Vec::new();
        for param in &self.graph.function(function)?.parameters {
            let source = match param.connections().first() {
                Some(id) => Some(self.graph.connection(*id)?.start.function),
                None => None,
            };
            sources.push(source);
        }

        let mut no_data = false;
        for source in sources {
            match source {
                Some(upstream) => {
                    if self.request_data_inner(upstream, correlation, visited)? == DataRequest::NoData {
                        no_data = true;
                    }
                }
                None => no_data = true,
            }
        }

        if no_data {
            self.graph
                .function_mut(function)?
                .warnings
                .add(Warning::NoDataFound);
            let name = self.graph.display_name(function)?;
            self.log(
                LogLevel::Warn,
                format!("Error in {name} block: {}", Warning::NoDataFound.message()),
            );
            return Ok(DataRequest::NoData);
        }

        let f = self.graph.function_mut(function)?;
        f.warnings.remove(&Warning::NoDataFound);
        let event = Event::ExecuteCode {
            code: f.code().to_string(),
            ret_val_code: f.ret_val_code(),
            function: Some(function),
            correlation: Some(correlation),
            stamp: f.code_edit_stamp,
        };
        self.emit(event);
        visited.insert(function, DataRequest::Requested);
        Ok(DataRequest::Requested)
    }

    /// Records a finished kernel run of `function`.
    pub fn mark_computed(&mut self, function: FunctionId, stamp: u64) -> Result<(), AppError> {
        self.graph.function_mut(function)?.computed_stamp = stamp;
        Ok(())
    }
}

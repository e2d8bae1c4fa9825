//! The graphical (block) editor.
//!
//! Holds one [`BlockView`] per function of the shown model, a mirror of every
//! connection between them, the zoom level and an optional brushing
//! rectangle. Connections are drawn by dragging from a port; the drop onto a
//! parameter is checked here before the application connects anything.

use grml_core::connection::ConnectionDraft;
use grml_core::error::{ConnectError, CoreError};
use grml_core::graph::ModelGraph;
use grml_core::id::{ConnectionId, FunctionId, ModelId};
use grml_core::port::{PortKind, PortRef};
use grml_core::registry::Registry;
use grml_core::representation::RepresentationKind;
use serde::Serialize;

use crate::editor::{Editor, UpdateReport};
use crate::error::ViewError;
use crate::library::Library;
use crate::panel::PropertyPanel;
use crate::render::BlockView;
use crate::selection::Selection;

/// Drawn counterpart of a model connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireMirror {
    pub connection: ConnectionId,
    pub start: PortRef,
    pub end: PortRef,
}

/// Result of releasing the mouse after brushing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrushOutcome {
    /// Press and release at the same point: a background click.
    Click,
    /// Blocks whose anchor lies inside the rectangle, in view order.
    Brushed(Vec<FunctionId>),
}

#[derive(Debug, Clone)]
pub struct GraphicalEditor {
    model: Option<ModelId>,
    blocks: Vec<BlockView>,
    wires: Vec<WireMirror>,
    zoom: i32,
    brush: Option<(f64, f64)>,
    draft: Option<ConnectionDraft>,
    panel: PropertyPanel,
    library: Library,
}

impl Default for GraphicalEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicalEditor {
    pub fn new() -> Self {
        GraphicalEditor {
            model: None,
            blocks: Vec::new(),
            wires: Vec::new(),
            zoom: 0,
            brush: None,
            draft: None,
            panel: PropertyPanel::with_port_entries(),
            library: Library::default(),
        }
    }

    pub fn blocks(&self) -> &[BlockView] {
        &self.blocks
    }

    pub fn block(&self, function: FunctionId) -> Option<&BlockView> {
        self.blocks.iter().find(|b| b.function == function)
    }

    pub fn wires(&self) -> &[WireMirror] {
        &self.wires
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Lists the library of `model_kind`.
    pub fn load_library(&mut self, registry: &Registry, model_kind: &str) -> Result<(), ViewError> {
        self.library = Library::for_model(registry, model_kind)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    pub fn zoom_level(&self) -> i32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, level: i32) {
        self.zoom = level;
    }

    /// Scale factor applied to the canvas and the background grid.
    pub fn scale(&self) -> f64 {
        1.0 + f64::from(self.zoom) * 0.1
    }

    /// Wheel handler. Only ctrl+wheel zooms; one notch per event.
    pub fn on_wheel(&mut self, delta_y: f64, ctrl: bool) -> bool {
        if !ctrl {
            return false;
        }
        self.zoom += if delta_y > 0.0 { 1 } else { -1 };
        true
    }

    // ------------------------------------------------------------------
    // Brushing
    // ------------------------------------------------------------------

    /// Mouse down on the background.
    pub fn begin_brush(&mut self, x: f64, y: f64) {
        self.brush = Some((x, y));
    }

    pub fn is_brushing(&self) -> bool {
        self.brush.is_some()
    }

    /// Mouse up. Returns `None` when no brush was started.
    pub fn end_brush(&mut self, x: f64, y: f64) -> Option<BrushOutcome> {
        let (ox, oy) = self.brush.take()?;
        if ox == x && oy == y {
            return Some(BrushOutcome::Click);
        }
        let min = (ox.min(x), oy.min(y));
        let max = (ox.max(x), oy.max(y));
        let hits = self
            .blocks
            .iter()
            .filter(|b| b.inside(min, max))
            .map(|b| b.function)
            .collect();
        Some(BrushOutcome::Brushed(hits))
    }

    // ------------------------------------------------------------------
    // Connection drawing
    // ------------------------------------------------------------------

    /// Starts dragging a wire out of `start`.
    pub fn begin_connection(&mut self, start: PortRef) {
        self.draft = Some(ConnectionDraft::from_start(start));
    }

    pub fn cancel_connection(&mut self) {
        self.draft = None;
    }

    pub fn draft(&self) -> Option<&ConnectionDraft> {
        self.draft.as_ref()
    }

    /// Drops the dragged wire on `end`. A parameter takes at most one wire.
    /// Returns the endpoints to connect.
    pub fn drop_connection(
        &mut self,
        graph: &ModelGraph,
        end: PortRef,
    ) -> Result<(PortRef, PortRef), ViewError> {
        let mut draft = self
            .draft
            .take()
            .ok_or(CoreError::from(ConnectError::MissingSource))?;
        draft.end = Some(end);
        let (start, end) = draft.finalize().map_err(CoreError::from)?;

        let port = graph.port(end)?;
        if port.kind == PortKind::Parameter && port.is_connected() {
            return Err(CoreError::from(ConnectError::InputOccupied { port: end.port }).into());
        }
        Ok((start, end))
    }

    fn refresh_wires(&mut self, graph: &ModelGraph) {
        let shown = |f: FunctionId| self.blocks.iter().any(|b| b.function == f);
        let wires: Vec<WireMirror> = graph
            .connections()
            .filter(|c| shown(c.start.function) && shown(c.end.function))
            .map(|c| WireMirror {
                connection: c.id,
                start: c.start,
                end: c.end,
            })
            .collect();
        self.wires = wires;
    }
}

impl Editor for GraphicalEditor {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Block
    }

    fn model(&self) -> Option<ModelId> {
        self.model
    }

    fn update(
        &mut self,
        graph: &ModelGraph,
        model: ModelId,
        selection: &Selection,
    ) -> Result<UpdateReport, ViewError> {
        let mut report = UpdateReport::default();
        if self.model != Some(model) {
            report.removed.extend(self.blocks.drain(..).map(|b| b.function));
            self.wires.clear();
            self.draft = None;
            self.model = Some(model);
        }

        let children = graph.children(model)?;
        self.blocks.retain(|b| {
            let keep = children.iter().any(|c| c.id == b.function);
            if !keep {
                report.removed.push(b.function);
            }
            keep
        });

        for child in &children {
            let Some(mut view) = BlockView::render(graph, child)? else {
                continue;
            };
            view.selected = selection.contains(child.id);
            match self.blocks.iter_mut().find(|b| b.function == child.id) {
                Some(existing) => *existing = view,
                None => {
                    report.added.push(child.id);
                    self.blocks.push(view);
                }
            }
        }

        self.refresh_wires(graph);
        if let Some(bound) = self.panel.bound() {
            if !graph.contains_function(bound) {
                self.panel.bind(graph, None)?;
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                added = report.added.len(),
                removed = report.removed.len(),
                "graphical editor updated"
            );
        }
        Ok(report)
    }

    fn on_select(&mut self, graph: &ModelGraph, function: Option<FunctionId>) -> Result<(), ViewError> {
        self.panel.bind(graph, function)
    }

    fn update_connections(&mut self, graph: &ModelGraph, _function: FunctionId) -> Result<(), ViewError> {
        self.refresh_wires(graph);
        Ok(())
    }

    fn panel(&self) -> &PropertyPanel {
        &self.panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionMode;
    use grml_core::builtin::{PIPELINE_MODEL, TRAIN_TEST_SPLIT};

    struct Fixture {
        registry: Registry,
        graph: ModelGraph,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Registry::with_builtins();
            let graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
            Fixture { registry, graph }
        }

        fn split_at(&mut self, x: f64, y: f64) -> FunctionId {
            let root = self.graph.root();
            let f = self
                .graph
                .add_function(&self.registry, TRAIN_TEST_SPLIT, root)
                .unwrap();
            self.graph.move_function(f, x, y).unwrap();
            f
        }

        fn ret(&self, f: FunctionId) -> PortRef {
            self.graph.function(f).unwrap().return_values[0].port_ref()
        }

        fn param(&self, f: FunctionId) -> PortRef {
            self.graph.function(f).unwrap().parameters[0].port_ref()
        }
    }

    #[test]
    fn update_is_idempotent() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let b = fx.split_at(50.0, 50.0);
        let (start, end) = (fx.ret(a), fx.param(b));
        fx.graph.connect(start, end).unwrap();

        let mut editor = GraphicalEditor::new();
        let selection = Selection::new();
        let root = fx.graph.root();
        let first = editor.update(&fx.graph, root, &selection).unwrap();
        assert_eq!(first.added, vec![a, b]);
        let blocks = editor.blocks().to_vec();
        let wires = editor.wires().to_vec();

        let second = editor.update(&fx.graph, root, &selection).unwrap();
        assert!(second.is_empty());
        assert_eq!(editor.blocks(), &blocks[..]);
        assert_eq!(editor.wires(), &wires[..]);
        assert_eq!(wires.len(), 1);
    }

    #[test]
    fn removed_functions_lose_their_blocks_and_wires() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let b = fx.split_at(50.0, 50.0);
        let (start, end) = (fx.ret(a), fx.param(b));
        fx.graph.connect(start, end).unwrap();

        let mut editor = GraphicalEditor::new();
        let selection = Selection::new();
        let root = fx.graph.root();
        editor.update(&fx.graph, root, &selection).unwrap();
        editor.on_select(&fx.graph, Some(a)).unwrap();

        fx.graph.remove_function(a).unwrap();
        let report = editor.update(&fx.graph, root, &selection).unwrap();
        assert_eq!(report.removed, vec![a]);
        assert!(editor.wires().is_empty());
        assert_eq!(editor.panel().bound(), None);
    }

    #[test]
    fn selected_flag_follows_selection() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let mut editor = GraphicalEditor::new();
        let mut selection = Selection::new();
        selection.apply(Some(a), SelectionMode::Switch);
        editor.update(&fx.graph, fx.graph.root(), &selection).unwrap();
        assert!(editor.block(a).unwrap().selected);
    }

    #[test]
    fn zoom_scales_in_tenths() {
        let mut editor = GraphicalEditor::new();
        assert_eq!(editor.scale(), 1.0);
        assert!(!editor.on_wheel(3.0, false));
        assert!(editor.on_wheel(3.0, true));
        assert!(editor.on_wheel(1.0, true));
        assert_eq!(editor.zoom_level(), 2);
        assert!((editor.scale() - 1.2).abs() < 1e-9);
        editor.on_wheel(-1.0, true);
        editor.set_zoom(-5);
        assert!((editor.scale() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn brushing_selects_blocks_inside() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let b = fx.split_at(50.0, 80.0);
        let _c = fx.split_at(200.0, 20.0);
        let mut editor = GraphicalEditor::new();
        editor.update(&fx.graph, fx.graph.root(), &Selection::new()).unwrap();

        // dragged from bottom right to top left
        editor.begin_brush(100.0, 100.0);
        assert_eq!(
            editor.end_brush(5.0, 5.0),
            Some(BrushOutcome::Brushed(vec![a, b]))
        );
        assert!(!editor.is_brushing());

        editor.begin_brush(30.0, 30.0);
        assert_eq!(editor.end_brush(30.0, 30.0), Some(BrushOutcome::Click));
        assert_eq!(editor.end_brush(1.0, 1.0), None);
    }

    #[test]
    fn blocks_on_the_edge_are_not_brushed() {
        let mut fx = Fixture::new();
        fx.split_at(10.0, 10.0);
        let mut editor = GraphicalEditor::new();
        editor.update(&fx.graph, fx.graph.root(), &Selection::new()).unwrap();
        editor.begin_brush(10.0, 0.0);
        assert_eq!(editor.end_brush(40.0, 40.0), Some(BrushOutcome::Brushed(vec![])));
    }

    #[test]
    fn a_parameter_takes_one_wire() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let b = fx.split_at(50.0, 50.0);
        let c = fx.split_at(90.0, 90.0);
        let mut editor = GraphicalEditor::new();

        editor.begin_connection(fx.ret(a));
        let (start, end) = editor.drop_connection(&fx.graph, fx.param(b)).unwrap();
        fx.graph.connect(start, end).unwrap();
        assert!(editor.draft().is_none());

        editor.begin_connection(fx.ret(c));
        let err = editor.drop_connection(&fx.graph, fx.param(b)).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Core(CoreError::Connect(ConnectError::InputOccupied { .. }))
        ));
    }

    #[test]
    fn dropping_without_a_drag_fails() {
        let mut fx = Fixture::new();
        let a = fx.split_at(10.0, 10.0);
        let mut editor = GraphicalEditor::new();
        assert!(editor.drop_connection(&fx.graph, fx.param(a)).is_err());
    }

    #[test]
    fn library_follows_model_kind() {
        let fx = Fixture::new();
        let mut editor = GraphicalEditor::new();
        editor.load_library(&fx.registry, PIPELINE_MODEL).unwrap();
        assert!(editor.library().contains(TRAIN_TEST_SPLIT));
    }
}

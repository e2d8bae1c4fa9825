//! The interface both editors implement.

use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, ModelId};
use grml_core::representation::RepresentationKind;

use crate::error::ViewError;
use crate::panel::PropertyPanel;
use crate::selection::Selection;

/// Views added and removed by one [`Editor::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added: Vec<FunctionId>,
    pub removed: Vec<FunctionId>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// An editor showing one model in one representation.
///
/// Editors only read the graph. Their own state (zoom, snippet order, line
/// numbers) never flows back into the model.
pub trait Editor {
    fn kind(&self) -> RepresentationKind;

    /// The model currently shown, if any.
    fn model(&self) -> Option<ModelId>;

    /// Synchronizes the views with `model`: removes views of functions that
    /// are gone, appends views for new ones and refreshes the rest. Calling
    /// it twice in a row changes nothing the second time.
    fn update(
        &mut self,
        graph: &ModelGraph,
        model: ModelId,
        selection: &Selection,
    ) -> Result<UpdateReport, ViewError>;

    /// Binds the property panel to `function`, or clears it.
    fn on_select(&mut self, graph: &ModelGraph, function: Option<FunctionId>) -> Result<(), ViewError>;

    /// Reacts to a new connection starting at `function`.
    fn update_connections(&mut self, graph: &ModelGraph, function: FunctionId) -> Result<(), ViewError>;

    fn panel(&self) -> &PropertyPanel;
}

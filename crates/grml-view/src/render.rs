//! Renderers: pure functions from model state to display state.
//!
//! A renderer never changes the graph. Editors keep the rendered views and
//! refresh them on every update.

use grml_core::function::Function;
use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, PortId};
use grml_core::port::Port;
use grml_core::warning::Warnings;
use serde::Serialize;

use crate::error::ViewError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortView {
    pub id: PortId,
    pub name: String,
    /// Display string of the port's data type.
    pub data_type: String,
    pub connected: bool,
    pub warnings: Vec<String>,
}

impl PortView {
    pub fn render(port: &Port) -> Self {
        PortView {
            id: port.id,
            name: port.name.clone(),
            data_type: port.data_type.to_string(),
            connected: port.is_connected(),
            warnings: messages(port.warnings()),
        }
    }
}

/// A function drawn as a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub function: FunctionId,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub protected: bool,
    pub locked: bool,
    pub inputs: Vec<PortView>,
    pub outputs: Vec<PortView>,
    pub warnings: Vec<String>,
    /// Model functions open their submodel on double click.
    pub opens_submodel: bool,
    pub selected: bool,
}

impl BlockView {
    /// Renders `function` as a block. Returns `None` for functions without a
    /// block representation.
    pub fn render(graph: &ModelGraph, function: &Function) -> Result<Option<Self>, ViewError> {
        let Some(block) = function.block() else {
            return Ok(None);
        };
        Ok(Some(BlockView {
            function: function.id,
            title: graph.display_name(function.id)?,
            x: block.x,
            y: block.y,
            protected: block.protected,
            locked: block.locked,
            inputs: function.parameters.iter().map(PortView::render).collect(),
            outputs: function.return_values.iter().map(PortView::render).collect(),
            warnings: messages(&function.warnings),
            opens_submodel: function.is_model_function(),
            selected: false,
        }))
    }

    /// Whether the block's anchor lies strictly inside the given rectangle.
    pub fn inside(&self, min: (f64, f64), max: (f64, f64)) -> bool {
        self.x > min.0 && self.y > min.1 && self.x < max.0 && self.y < max.1
    }
}

/// A function shown as a code snippet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetView {
    pub function: FunctionId,
    pub title: String,
    pub code: String,
    pub loc: usize,
    /// Executable functions get a run button.
    pub runnable: bool,
    pub warnings: Vec<String>,
    pub selected: bool,
    /// Snippets of the nested model, for model functions.
    pub closure: Vec<SnippetView>,
}

impl SnippetView {
    /// Renders `function` as a snippet without its closure. Returns `None`
    /// for functions without a code representation.
    pub fn render(graph: &ModelGraph, function: &Function) -> Result<Option<Self>, ViewError> {
        let Some(state) = function.code_state() else {
            return Ok(None);
        };
        Ok(Some(SnippetView {
            function: function.id,
            title: graph.display_name(function.id)?,
            code: state.code.clone(),
            loc: state.loc(),
            runnable: function.executable,
            warnings: messages(&function.warnings),
            selected: false,
            closure: Vec::new(),
        }))
    }

    /// Lines taken by this snippet and its closure.
    pub fn total_loc(&self) -> usize {
        self.loc + self.closure.iter().map(SnippetView::total_loc).sum::<usize>()
    }
}

fn messages(warnings: &Warnings) -> Vec<String> {
    warnings.messages().into_iter().map(str::to_string).collect()
}

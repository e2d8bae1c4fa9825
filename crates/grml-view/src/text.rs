//! The textual (code) editor.
//!
//! Shows one [`SnippetView`] per function of the model, in an order the
//! editor owns. New snippets are appended; when a function gets connected its
//! snippet is moved in front of a consumer (see
//! [`OrderingStrategy::ScanFromEnd`]). Model functions carry the snippets of
//! their nested model as a closure.

use std::fmt;
use std::str::FromStr;

use grml_check::topological_order;
use grml_core::graph::{Closure, ModelGraph};
use grml_core::id::{FunctionId, ModelId};
use grml_core::representation::RepresentationKind;
use grml_core::warning::Warning;
use serde::{Deserialize, Serialize};

use crate::editor::{Editor, UpdateReport};
use crate::error::ViewError;
use crate::panel::PropertyPanel;
use crate::render::SnippetView;
use crate::selection::Selection;

/// How snippets are ordered when connections change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingStrategy {
    /// Move a newly connected producer right before the last snippet that
    /// consumes one of its outputs.
    #[default]
    #[serde(rename = "scan")]
    ScanFromEnd,
    /// Keep snippets in dataflow order. Cyclic models keep their order.
    #[serde(rename = "topological")]
    Topological,
}

impl FromStr for OrderingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(OrderingStrategy::ScanFromEnd),
            "topological" => Ok(OrderingStrategy::Topological),
            other => Err(format!("unknown text ordering '{other}'")),
        }
    }
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingStrategy::ScanFromEnd => write!(f, "scan"),
            OrderingStrategy::Topological => write!(f, "topological"),
        }
    }
}

/// Line numbers shown next to the code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineEnumeration {
    lines: usize,
}

impl LineEnumeration {
    pub fn count(&self) -> usize {
        self.lines
    }

    pub fn numbers(&self) -> impl Iterator<Item = usize> {
        1..=self.lines
    }

    pub fn append(&mut self, lines: usize) {
        self.lines += lines;
    }

    pub fn remove(&mut self, lines: usize) {
        self.lines = self.lines.saturating_sub(lines);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextEditor {
    model: Option<ModelId>,
    snippets: Vec<SnippetView>,
    enumeration: LineEnumeration,
    ordering: OrderingStrategy,
    panel: PropertyPanel,
}

impl TextEditor {
    pub fn new(ordering: OrderingStrategy) -> Self {
        TextEditor {
            ordering,
            ..Self::default()
        }
    }

    pub fn ordering(&self) -> OrderingStrategy {
        self.ordering
    }

    pub fn snippets(&self) -> &[SnippetView] {
        &self.snippets
    }

    pub fn snippet(&self, function: FunctionId) -> Option<&SnippetView> {
        self.snippets.iter().find(|s| s.function == function)
    }

    /// Function ids in display order.
    pub fn order(&self) -> Vec<FunctionId> {
        self.snippets.iter().map(|s| s.function).collect()
    }

    pub fn enumeration(&self) -> &LineEnumeration {
        &self.enumeration
    }

    /// Functions shown right before and after `function`.
    pub fn neighbours(&self, function: FunctionId) -> (Option<FunctionId>, Option<FunctionId>) {
        let Some(index) = self.position(function) else {
            return (None, None);
        };
        let previous = index.checked_sub(1).map(|i| self.snippets[i].function);
        let next = self.snippets.get(index + 1).map(|s| s.function);
        (previous, next)
    }

    /// The whole program text, top-level snippets joined by newlines.
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        for snippet in &self.snippets {
            push_lines(snippet, 0, &mut lines);
        }
        lines.join("\n")
    }

    fn position(&self, function: FunctionId) -> Option<usize> {
        self.snippets.iter().position(|s| s.function == function)
    }

    fn reorder_topologically(&mut self, graph: &ModelGraph, model: ModelId) -> Result<(), ViewError> {
        let order = match topological_order(graph, model) {
            Ok(order) => order,
            Err(grml_check::CheckError::Cyclic { function, .. }) => {
                tracing::debug!(%function, "model is cyclic, keeping snippet order");
                return Ok(());
            }
            Err(other) => return Err(other.into()),
        };
        let rank = |f: FunctionId| order.iter().position(|o| *o == f).unwrap_or(usize::MAX);
        self.snippets.sort_by_key(|s| rank(s.function));
        Ok(())
    }
}

fn push_lines(snippet: &SnippetView, depth: usize, out: &mut Vec<String>) {
    let indent = "    ".repeat(depth);
    for line in snippet.code.lines() {
        out.push(format!("{indent}{line}"));
    }
    for nested in &snippet.closure {
        push_lines(nested, depth + 1, out);
    }
}

/// Renders `function` with its closure, marking selected snippets at every
/// depth.
fn render_tree(
    graph: &ModelGraph,
    function: FunctionId,
    selection: &Selection,
) -> Result<Option<SnippetView>, ViewError> {
    let f = graph.function(function)?;
    let Some(mut view) = SnippetView::render(graph, f)? else {
        return Ok(None);
    };
    view.selected = selection.contains(function);

    if let Some(sub) = f.submodel {
        match graph.closure(sub)? {
            Closure::Incomplete => {
                let message = Warning::ModelIncomplete.message().to_string();
                if !view.warnings.contains(&message) {
                    view.warnings.push(message);
                }
            }
            closure => {
                for id in closure.functions() {
                    if let Some(nested) = render_tree(graph, *id, selection)? {
                        view.closure.push(nested);
                    }
                }
            }
        }
    }
    Ok(Some(view))
}

impl Editor for TextEditor {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Code
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
            report.removed.extend(self.snippets.drain(..).map(|s| s.function));
            self.enumeration = LineEnumeration::default();
            self.model = Some(model);
        }

        let children: Vec<FunctionId> = graph.model(model)?.children.clone();
        let enumeration = &mut self.enumeration;
        self.snippets.retain(|s| {
            let keep = children.contains(&s.function);
            if !keep {
                enumeration.remove(s.total_loc());
                report.removed.push(s.function);
            }
            keep
        });

        for child in children {
            let Some(view) = render_tree(graph, child, selection)? else {
                continue;
            };
            match self.snippets.iter_mut().find(|s| s.function == child) {
                Some(existing) => {
                    self.enumeration.remove(existing.total_loc());
                    self.enumeration.append(view.total_loc());
                    *existing = view;
                }
                None => {
                    self.enumeration.append(view.total_loc());
                    report.added.push(child);
                    self.snippets.push(view);
                }
            }
        }

        if self.ordering == OrderingStrategy::Topological {
            self.reorder_topologically(graph, model)?;
        }
        if let Some(bound) = self.panel.bound() {
            if !graph.contains_function(bound) {
                self.panel.bind(graph, None)?;
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                added = report.added.len(),
                removed = report.removed.len(),
                lines = self.enumeration.count(),
                "text editor updated"
            );
        }
        Ok(report)
    }

    fn on_select(&mut self, graph: &ModelGraph, function: Option<FunctionId>) -> Result<(), ViewError> {
        self.panel.bind(graph, function)
    }

    fn update_connections(&mut self, graph: &ModelGraph, function: FunctionId) -> Result<(), ViewError> {
        if self.ordering == OrderingStrategy::Topological {
            return match self.model {
                Some(model) => self.reorder_topologically(graph, model),
                None => Ok(()),
            };
        }

        let consumers = graph.downstream(function)?;
        if consumers.is_empty() {
            return Ok(());
        }
        let Some(from) = self.position(function) else {
            return Ok(());
        };
        let Some(target) = self
            .snippets
            .iter()
            .rposition(|s| consumers.contains(&s.function))
        else {
            return Ok(());
        };

        let snippet = self.snippets.remove(from);
        let target = if from < target { target - 1 } else { target };
        self.snippets.insert(target, snippet);
        Ok(())
    }

    fn panel(&self) -> &PropertyPanel {
        &self.panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grml_core::builtin::{COMPOSITE_NN, INPUT, LAYER, PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::port::PortRef;
    use grml_core::property::PropertyPatch;
    use grml_core::registry::Registry;
    use serde_json::json;

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

        fn add(&mut self, kind: &str) -> FunctionId {
            let root = self.graph.root();
            self.graph.add_function(&self.registry, kind, root).unwrap()
        }

        fn wire(&mut self, from: FunctionId, to: FunctionId) {
            let start: PortRef = self.graph.function(from).unwrap().return_values[0].port_ref();
            let end: PortRef = self.graph.function(to).unwrap().parameters[0].port_ref();
            self.graph.connect(start, end).unwrap();
        }
    }

    #[test]
    fn update_is_idempotent() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let b = fx.add(COMPOSITE_NN);
        let mut editor = TextEditor::default();
        let selection = Selection::new();
        let root = fx.graph.root();

        let first = editor.update(&fx.graph, root, &selection).unwrap();
        assert_eq!(first.added, vec![a, b]);
        let snippets = editor.snippets().to_vec();
        let lines = editor.enumeration().count();

        let second = editor.update(&fx.graph, root, &selection).unwrap();
        assert!(second.is_empty());
        assert_eq!(editor.snippets(), &snippets[..]);
        assert_eq!(editor.enumeration().count(), lines);
    }

    #[test]
    fn lines_follow_snippets() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let _b = fx.add(TRAIN_TEST_SPLIT);
        let mut editor = TextEditor::default();
        let root = fx.graph.root();
        editor.update(&fx.graph, root, &Selection::new()).unwrap();
        assert_eq!(editor.enumeration().count(), 4);
        assert_eq!(editor.enumeration().numbers().last(), Some(4));

        fx.graph.remove_function(a).unwrap();
        let report = editor.update(&fx.graph, root, &Selection::new()).unwrap();
        assert_eq!(report.removed, vec![a]);
        assert_eq!(editor.enumeration().count(), 2);
    }

    #[test]
    fn connected_producer_moves_before_its_consumer() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let b = fx.add(TRAIN_TEST_SPLIT);
        let c = fx.add(TRAIN_TEST_SPLIT);
        let mut editor = TextEditor::default();
        let root = fx.graph.root();
        editor.update(&fx.graph, root, &Selection::new()).unwrap();

        // c feeds a: c is moved right before a
        fx.wire(c, a);
        editor.update_connections(&fx.graph, c).unwrap();
        assert_eq!(editor.order(), vec![c, a, b]);

        // only the last consumer found from the end counts
        fx.wire(c, b);
        editor.update_connections(&fx.graph, c).unwrap();
        assert_eq!(editor.order(), vec![a, c, b]);
    }

    #[test]
    fn scan_and_topological_agree_on_chains() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let b = fx.add(TRAIN_TEST_SPLIT);
        let root = fx.graph.root();
        let mut scan = TextEditor::new(OrderingStrategy::ScanFromEnd);
        let mut topo = TextEditor::new(OrderingStrategy::Topological);
        scan.update(&fx.graph, root, &Selection::new()).unwrap();
        topo.update(&fx.graph, root, &Selection::new()).unwrap();

        fx.wire(b, a);
        scan.update_connections(&fx.graph, b).unwrap();
        topo.update_connections(&fx.graph, b).unwrap();
        assert_eq!(scan.order(), vec![b, a]);
        assert_eq!(topo.order(), vec![b, a]);
    }

    #[test]
    fn topological_order_survives_cycles() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let b = fx.add(TRAIN_TEST_SPLIT);
        let root = fx.graph.root();
        let mut editor = TextEditor::new(OrderingStrategy::Topological);
        editor.update(&fx.graph, root, &Selection::new()).unwrap();
        fx.wire(a, b);
        fx.wire(b, a);
        editor.update(&fx.graph, root, &Selection::new()).unwrap();
        assert_eq!(editor.order(), vec![a, b]);
    }

    #[test]
    fn closures_follow_the_layer_chain() {
        let mut fx = Fixture::new();
        let nn = fx.add(COMPOSITE_NN);
        let sub = fx.graph.submodel_of(nn).unwrap();
        let input = fx.graph.model(sub).unwrap().children[0];
        assert_eq!(fx.graph.function(input).unwrap().kind, INPUT);
        let layer = fx.graph.add_function(&fx.registry, LAYER, sub).unwrap();
        let _loose = fx.graph.add_function(&fx.registry, LAYER, sub).unwrap();
        fx.graph
            .set_property(input, &PropertyPatch::new("type", json!("Tensor")))
            .unwrap();
        fx.wire(input, layer);

        let mut editor = TextEditor::default();
        let mut selection = Selection::new();
        selection.set([layer]);
        editor.update(&fx.graph, fx.graph.root(), &selection).unwrap();

        let snippet = editor.snippet(nn).unwrap();
        // the input is block-only, the unconnected layer is outside the chain
        assert_eq!(snippet.closure.len(), 1);
        assert_eq!(snippet.closure[0].function, layer);
        assert!(snippet.closure[0].selected);
        assert!(editor.text().contains("    "));
    }

    #[test]
    fn incomplete_closures_are_flagged() {
        let mut fx = Fixture::new();
        let nn = fx.add(COMPOSITE_NN);
        let sub = fx.graph.submodel_of(nn).unwrap();
        let input = fx.graph.model(sub).unwrap().children[0];
        fx.graph.remove_function(input).unwrap();

        let mut editor = TextEditor::default();
        editor.update(&fx.graph, fx.graph.root(), &Selection::new()).unwrap();
        let snippet = editor.snippet(nn).unwrap();
        assert!(snippet.closure.is_empty());
        assert!(snippet
            .warnings
            .contains(&Warning::ModelIncomplete.message().to_string()));
    }

    #[test]
    fn neighbours_in_display_order() {
        let mut fx = Fixture::new();
        let a = fx.add(TRAIN_TEST_SPLIT);
        let b = fx.add(TRAIN_TEST_SPLIT);
        let mut editor = TextEditor::default();
        editor.update(&fx.graph, fx.graph.root(), &Selection::new()).unwrap();
        assert_eq!(editor.neighbours(a), (None, Some(b)));
        assert_eq!(editor.neighbours(b), (Some(a), None));
    }

    #[test]
    fn ordering_parses_config_values() {
        assert_eq!("scan".parse::<OrderingStrategy>(), Ok(OrderingStrategy::ScanFromEnd));
        assert_eq!(
            " Topological ".parse::<OrderingStrategy>(),
            Ok(OrderingStrategy::Topological)
        );
        assert!("random".parse::<OrderingStrategy>().is_err());
    }
}

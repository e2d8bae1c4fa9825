//! Dataflow ordering of a model's functions.
//!
//! Builds a petgraph `DiGraph` with one node per child function and one edge
//! per connection between children, then orders or cycle-checks it.

use std::collections::HashMap;

use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, ModelId};
use petgraph::algo::{is_cyclic_directed, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::diagnostics::CheckError;

/// Dataflow dependencies between the children of one model.
pub struct DependencyGraph {
    pub graph: DiGraph<FunctionId, ()>,
    pub nodes: HashMap<FunctionId, NodeIndex>,
}

/// Builds the dependency graph of `model`. Connections leaving the model
/// are ignored.
pub fn dependency_graph(graph: &ModelGraph, model: ModelId) -> Result<DependencyGraph, CheckError> {
    let m = graph.model(model)?;
    let mut deps = DiGraph::new();
    let mut nodes = HashMap::new();
    for child in &m.children {
        nodes.insert(*child, deps.add_node(*child));
    }
    for c in graph.connections() {
        if let (Some(from), Some(to)) = (nodes.get(&c.start.function), nodes.get(&c.end.function)) {
            deps.update_edge(*from, *to, ());
        }
    }
    Ok(DependencyGraph { graph: deps, nodes })
}

/// Children of `model` ordered so every producer precedes its consumers.
pub fn topological_order(graph: &ModelGraph, model: ModelId) -> Result<Vec<FunctionId>, CheckError> {
    let deps = dependency_graph(graph, model)?;
    toposort(&deps.graph, None)
        .map(|order| order.into_iter().map(|idx| deps.graph[idx]).collect())
        .map_err(|cycle| CheckError::Cyclic {
            model,
            function: deps.graph[cycle.node_id()],
        })
}

pub fn has_cycle(graph: &ModelGraph, model: ModelId) -> Result<bool, CheckError> {
    Ok(is_cyclic_directed(&dependency_graph(graph, model)?.graph))
}

/// Groups of functions that feed into each other. Self-contained functions
/// are not reported.
pub fn cycles(graph: &ModelGraph, model: ModelId) -> Result<Vec<Vec<FunctionId>>, CheckError> {
    let deps = dependency_graph(graph, model)?;
    Ok(tarjan_scc(&deps.graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().map(|idx| deps.graph[idx]).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grml_core::builtin::{PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::registry::Registry;

    fn wire(graph: &mut ModelGraph, from: FunctionId, to: FunctionId) {
        let start = graph.function(from).unwrap().return_values[0].port_ref();
        let end = graph.function(to).unwrap().parameters[0].port_ref();
        graph.connect(start, end).unwrap();
    }

    fn splits(n: usize) -> (ModelGraph, Vec<FunctionId>) {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let root = graph.root();
        let ids = (0..n)
            .map(|_| graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap())
            .collect();
        (graph, ids)
    }

    fn position(order: &[FunctionId], f: FunctionId) -> usize {
        order.iter().position(|x| *x == f).unwrap()
    }

    #[test]
    fn producers_come_first() {
        let (mut graph, ids) = splits(3);
        // inserted a, b, c; wired c -> b -> a
        wire(&mut graph, ids[2], ids[1]);
        wire(&mut graph, ids[1], ids[0]);

        let order = topological_order(&graph, graph.root()).unwrap();
        assert_eq!(order.len(), 3);
        assert!(position(&order, ids[2]) < position(&order, ids[1]));
        assert!(position(&order, ids[1]) < position(&order, ids[0]));
        assert!(!has_cycle(&graph, graph.root()).unwrap());
    }

    #[test]
    fn cycles_are_reported() {
        let (mut graph, ids) = splits(3);
        wire(&mut graph, ids[0], ids[1]);
        wire(&mut graph, ids[1], ids[0]);

        assert!(has_cycle(&graph, graph.root()).unwrap());
        assert!(matches!(
            topological_order(&graph, graph.root()),
            Err(CheckError::Cyclic { .. })
        ));
        let groups = cycles(&graph, graph.root()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert!(!groups[0].contains(&ids[2]));
    }

    #[test]
    fn parallel_edges_collapse() {
        let (mut graph, ids) = splits(2);
        wire(&mut graph, ids[0], ids[1]);
        wire(&mut graph, ids[0], ids[1]);
        let deps = dependency_graph(&graph, graph.root()).unwrap();
        assert_eq!(deps.graph.edge_count(), 1);
    }

    proptest::proptest! {
        #[test]
        fn forward_edges_never_cycle(
            edges in proptest::collection::vec((0usize..6, 0usize..6), 0..12)
        ) {
            let (mut graph, ids) = splits(6);
            for (a, b) in edges {
                let (from, to) = (a.min(b), a.max(b));
                if from != to {
                    wire(&mut graph, ids[from], ids[to]);
                }
            }
            let root = graph.root();
            proptest::prop_assert!(!has_cycle(&graph, root).unwrap());
            let order = topological_order(&graph, root).unwrap();
            for c in graph.connections() {
                proptest::prop_assert!(
                    position(&order, c.start.function) < position(&order, c.end.function)
                );
            }
        }
    }
}

//! Whole-model validation.
//!
//! [`validate`] reads every model of the graph and reports all problems at
//! once. It never modifies the graph.

use std::collections::HashMap;

use grml_core::graph::{Closure, ModelGraph};
use grml_core::id::PortId;
use grml_core::types::compatible;

use crate::diagnostics::{CheckError, Diagnostic};
use crate::order::cycles;

/// Validates every model reachable from the root.
pub fn validate(graph: &ModelGraph) -> Result<Vec<Diagnostic>, CheckError> {
    let mut out = Vec::new();

    for model in graph.models() {
        for f in graph.children(model.id)? {
            for (index, param) in f.parameters.iter().enumerate() {
                match param.connections().len() {
                    0 => out.push(Diagnostic::UnconnectedParameter {
                        function: f.id,
                        port: param.id,
                        index,
                    }),
                    1 => {}
                    count => out.push(Diagnostic::MultipleSources {
                        function: f.id,
                        port: param.id,
                        count,
                    }),
                }
            }
        }

        for (name, _) in model.variables() {
            let defined = graph
                .children(model.id)?
                .iter()
                .any(|f| f.return_values.iter().any(|r| &r.name == name));
            if !defined {
                out.push(Diagnostic::DanglingVariable {
                    model: model.id,
                    name: name.clone(),
                });
            }
        }

        for functions in cycles(graph, model.id)? {
            out.push(Diagnostic::Cycle {
                model: model.id,
                functions,
            });
        }

        if graph.closure(model.id)? == Closure::Incomplete {
            out.push(Diagnostic::IncompleteModel {
                model: model.id,
                owner: model.parent,
            });
        }
    }

    let mut pairs: HashMap<(PortId, PortId), usize> = HashMap::new();
    for c in graph.connections() {
        let output = graph.port(c.start)?;
        let input = graph.port(c.end)?;
        if !compatible(&output.data_type, &input.data_type) {
            out.push(Diagnostic::IncompatibleConnection {
                connection: c.id,
                output: output.data_type.to_string(),
                input: input.data_type.to_string(),
            });
        }
        *pairs.entry((c.start.port, c.end.port)).or_default() += 1;
    }
    let mut duplicates: Vec<_> = pairs.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for ((start, end), count) in duplicates {
        out.push(Diagnostic::DuplicateConnection { start, end, count });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use grml_core::builtin::{COMPOSITE_NN, INPUT, PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::property::PropertyPatch;
    use grml_core::registry::Registry;
    use grml_core::types::DataType;
    use serde_json::json;

    fn count(diags: &[Diagnostic], pred: impl Fn(&Diagnostic) -> bool) -> usize {
        diags.iter().filter(|d| pred(d)).count()
    }

    #[test]
    fn empty_pipeline_is_clean() {
        let registry = Registry::with_builtins();
        let graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        assert!(validate(&graph).unwrap().is_empty());
    }

    #[test]
    fn reports_unconnected_duplicates_and_dangling() {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let root = graph.root();
        let a = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let b = graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap();
        let start = graph.function(a).unwrap().return_values[0].port_ref();
        let end = graph.function(b).unwrap().parameters[0].port_ref();
        graph.connect(start, end).unwrap();
        graph.connect(start, end).unwrap();
        graph.add_variable(root, "ghost", DataType::None).unwrap();

        let diags = validate(&graph).unwrap();
        assert_eq!(
            count(&diags, |d| matches!(d, Diagnostic::UnconnectedParameter { function, .. } if *function == a)),
            1
        );
        assert_eq!(count(&diags, |d| matches!(d, Diagnostic::MultipleSources { count: 2, .. })), 1);
        assert_eq!(count(&diags, |d| matches!(d, Diagnostic::DuplicateConnection { count: 2, .. })), 1);
        assert_eq!(
            count(&diags, |d| matches!(d, Diagnostic::DanglingVariable { name, .. } if name == "ghost")),
            1
        );
        assert!(diags.iter().all(|d| d.severity() == Severity::Warning));
    }

    #[test]
    fn reports_retyped_connections_and_incomplete_models() {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let nn = graph.add_function(&registry, COMPOSITE_NN, graph.root()).unwrap();
        let sub = graph.submodel_of(nn).unwrap();
        let input = graph.model(sub).unwrap().children[0];
        assert_eq!(graph.function(input).unwrap().kind, INPUT);

        let output = graph.add_function(&registry, grml_core::builtin::OUTPUT, sub).unwrap();
        graph
            .set_property(input, &PropertyPatch::new("type", json!("Tensor")))
            .unwrap();
        graph
            .set_property(output, &PropertyPatch::new("type", json!("Tensor")))
            .unwrap();
        let start = graph.function(input).unwrap().return_values[0].port_ref();
        let end = graph.function(output).unwrap().parameters[0].port_ref();
        graph.connect(start, end).unwrap();
        graph
            .set_property(output, &PropertyPatch::new("type", json!("Model")))
            .unwrap();

        let diags = validate(&graph).unwrap();
        assert_eq!(count(&diags, |d| matches!(d, Diagnostic::IncompatibleConnection { .. })), 1);

        graph.remove_function(input).unwrap();
        let diags = validate(&graph).unwrap();
        assert!(diags.iter().any(|d| matches!(
            d,
            Diagnostic::IncompleteModel { owner: Some(o), .. } if *o == nn
        )));
    }
}

//! Variable name propagation along dataflow connections.
//!
//! When a named return value is connected, every parameter it feeds takes
//! its name. A parameter's owner then passes the name on through each of its
//! own return values of the same type tag that is unnamed or still carries
//! the parameter's previous name, and so on downstream. A replaced name
//! leaves the model's variable table once no return value carries it.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::graph::ModelGraph;
use crate::id::PortId;
use crate::port::PortRef;
use crate::types::DataType;

/// Propagates the name of the return value `start` downstream. Returns the
/// ports that were renamed, in visiting order.
///
/// Each return value is expanded at most once, so contrived cycles
/// terminate. Renamed return values are registered as variables of their
/// model.
pub fn propagate_name(graph: &mut ModelGraph, start: PortRef) -> Result<Vec<PortRef>, CoreError> {
    let mut renamed = Vec::new();
    let mut visited: HashSet<PortId> = HashSet::new();
    let mut pending = vec![start];

    while let Some(ret) = pending.pop() {
        if !visited.insert(ret.port) {
            continue;
        }
        let port = graph.port(ret)?;
        let name = port.name.clone();
        if name.is_empty() || !port.is_connected() {
            continue;
        }
        let ends: Vec<PortRef> = port
            .connections()
            .iter()
            .map(|c| graph.connection(*c).map(|c| c.end))
            .collect::<Result<_, _>>()?;

        for end in ends {
            let param = graph.port_mut(end)?;
            let old = std::mem::replace(&mut param.name, name.clone());
            let tag = param.data_type.tag();
            if old != name {
                renamed.push(end);
            }

            let owner = graph.function(end.function)?;
            let model = owner.model;
            let targets: Vec<(PortRef, DataType)> = owner
                .return_values
                .iter()
                .filter(|r| r.data_type.tag() == tag && (r.name.is_empty() || r.name == old))
                .map(|r| (r.port_ref(), r.data_type.clone()))
                .collect();

            for (target, data_type) in targets {
                let previous = graph.set_port_name(target, &name)?;
                if previous != name {
                    renamed.push(target);
                    if !previous.is_empty() {
                        graph.remove_variable(model, &previous)?;
                    }
                }
                graph.add_variable(model, &name, data_type)?;
                pending.push(target);
            }
        }
    }
    Ok(renamed)
}

//! Reading names and connections back from edited snippet code.
//!
//! Only the first line shape matters: `rets = param.method(...)`. Return
//! names are whatever precedes the first `=` (optionally wrapped in
//! parentheses), the parameter is whatever sits between the `=` and the
//! first `.`. Everything else in the snippet is opaque.

use grml_core::connection::ConnectionDescriptor;
use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, ModelId};
use grml_core::port::{PortKind, PortRef};
use grml_core::registry::Registry;
use grml_core::types::DataType;
use grml_core::warning::Warning;
use serde::Serialize;

use crate::error::ViewError;
use crate::panel::NameChangeKind;

/// Names found in a snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCode {
    pub returns: Vec<String>,
    pub parameter: Option<String>,
}

pub fn parse_code(code: &str) -> ParsedCode {
    let Some((head, tail)) = code.split_once('=') else {
        return ParsedCode::default();
    };

    let head = match (head.find('('), head.find(')')) {
        (Some(open), Some(close)) if open < close => &head[open + 1..close],
        _ => head,
    };
    let returns = head
        .split(',')
        .map(strip_whitespace)
        .filter(|name| is_identifier(name))
        .collect();

    let parameter = strip_whitespace(tail.split('.').next().unwrap_or(""));
    let parameter = is_identifier(&parameter).then_some(parameter);

    ParsedCode { returns, parameter }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// A port renamed by inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameChange {
    pub kind: NameChangeKind,
    pub port: PortRef,
    pub name: String,
}

/// Everything inference changed in the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inference {
    pub names: Vec<NameChange>,
    pub connections: Vec<ConnectionDescriptor>,
    /// Ports renamed by name propagation along new connections.
    pub renamed: Vec<PortRef>,
    /// Whether the code differs from what the template generates.
    pub code_invalid: bool,
}

/// Updates ports, variables and connections of `function` from its current
/// code. `previous` and `next` are the snippets displayed around it: a known
/// parameter name connects to a return value of `previous`, a known return
/// name to a parameter of `next`.
pub fn infer_from_code(
    graph: &mut ModelGraph,
    registry: &Registry,
    function: FunctionId,
    previous: Option<FunctionId>,
    next: Option<FunctionId>,
) -> Result<Inference, ViewError> {
    let f = graph.function(function)?;
    if f.code_state().is_none() {
        return Err(ViewError::NoCodeRepresentation { function });
    }
    let parsed = parse_code(f.code());
    let model = f.model;
    let first_param = f.parameters.first().map(|p| p.port_ref());
    let mut inference = Inference::default();

    if let (Some(name), Some(param)) = (&parsed.parameter, first_param) {
        if graph.model(model)?.variable(name).is_some() {
            if let Some(previous) = previous {
                if let Some(start) = matching_port(graph, previous, PortKind::ReturnValue, name)? {
                    link(graph, start, param, name, &mut inference)?;
                }
            }
        }
        rename(graph, model, param, name)?;
        inference.names.push(NameChange {
            kind: NameChangeKind::Parameter,
            port: param,
            name: name.clone(),
        });
    }

    let rets: Vec<PortRef> = graph
        .function(function)?
        .return_values
        .iter()
        .map(|r| r.port_ref())
        .collect();
    for (name, ret) in parsed.returns.iter().zip(rets) {
        if graph.model(model)?.variable(name).is_some() {
            if let Some(next) = next {
                if let Some(end) = matching_port(graph, next, PortKind::Parameter, name)? {
                    link(graph, ret, end, name, &mut inference)?;
                }
            }
        } else {
            rename(graph, model, ret, name)?;
        }
        inference.names.push(NameChange {
            kind: NameChangeKind::ReturnValue,
            port: ret,
            name: graph.port(ret)?.name.clone(),
        });
    }

    inference.code_invalid = flag_invalid_code(graph, registry, function)?;
    tracing::debug!(
        %function,
        names = inference.names.len(),
        connections = inference.connections.len(),
        invalid = inference.code_invalid,
        "inferred model changes from code"
    );
    Ok(inference)
}

fn matching_port(
    graph: &ModelGraph,
    function: FunctionId,
    kind: PortKind,
    name: &str,
) -> Result<Option<PortRef>, ViewError> {
    Ok(graph
        .function(function)?
        .ports(kind)
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.port_ref()))
}

/// Connects `start` to `end` when the variable, the return value and the
/// parameter share a type tag. An identical existing edge is kept as is.
fn link(
    graph: &mut ModelGraph,
    start: PortRef,
    end: PortRef,
    name: &str,
    inference: &mut Inference,
) -> Result<(), ViewError> {
    let model = graph.function(end.function)?.model;
    let variable = graph
        .model(model)?
        .variable(name)
        .map(|v| v.data_type.tag());
    let output = graph.port(start)?.data_type.tag();
    let input = graph.port(end)?.data_type.tag();
    if variable != Some(output) || output != input {
        return Err(ViewError::TypeMismatch {
            name: name.to_string(),
            expected: input,
            found: output,
        });
    }

    let descriptor = ConnectionDescriptor {
        param_func_id: end.function,
        param_id: end.port,
        return_value_id: start.port,
        return_value_func_id: start.function,
    };
    if graph.find_connection(&descriptor).is_some() {
        return Ok(());
    }
    let connected = graph.connect(start, end)?;
    inference.connections.push(descriptor);
    inference.renamed.extend(connected.renamed);
    Ok(())
}

/// Gives `port` the name `name`, moving its variable table entry along.
fn rename(graph: &mut ModelGraph, model: ModelId, port: PortRef, name: &str) -> Result<(), ViewError> {
    let data_type: DataType = graph.port(port)?.data_type.clone();
    let old = graph.set_port_name(port, name)?;
    if old == name {
        return Ok(());
    }
    if !old.is_empty() {
        graph.remove_variable(model, &old)?;
    }
    graph.add_variable(model, name, data_type)?;
    Ok(())
}

fn flag_invalid_code(
    graph: &mut ModelGraph,
    registry: &Registry,
    function: FunctionId,
) -> Result<bool, ViewError> {
    let free_form = registry.function(&graph.function(function)?.kind)?.free_form_code;
    let invalid = match graph.generated_code(registry, function)? {
        Some(generated) if !free_form => generated != graph.function(function)?.code(),
        _ => false,
    };
    let f = graph.function_mut(function)?;
    if invalid {
        f.warnings.add(Warning::CodeInvalid);
    } else {
        f.warnings.remove(&Warning::CodeInvalid);
    }
    Ok(invalid)
}

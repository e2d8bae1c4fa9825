//! Property panel bound to the selected function.
//!
//! The panel lists the function's properties and, in the graphical editor,
//! one name entry per port (`inputPortN` / `outputPortN`). Editing an entry
//! does not touch the graph: [`PropertyPanel::edit`] turns it into a
//! [`PanelEdit`] the application applies.

use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, PortId};
use grml_core::property::{PropertyKind, PropertyPatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ViewError;

/// What a name change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameChangeKind {
    ReturnValue,
    Parameter,
    /// Function titles. Not renamable.
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryTarget {
    Property,
    Port { kind: NameChangeKind, port: PortId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub key: String,
    pub label: String,
    pub kind: PropertyKind,
    pub value: Value,
    pub description: Option<String>,
    pub target: EntryTarget,
}

/// A committed panel edit, ready to be applied by the application.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEdit {
    Property {
        function: FunctionId,
        patch: PropertyPatch,
    },
    Rename {
        kind: NameChangeKind,
        port: PortId,
        name: String,
        parent: FunctionId,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPanel {
    bound: Option<FunctionId>,
    entries: Vec<PanelEntry>,
    port_entries: bool,
}

impl PropertyPanel {
    /// A panel listing properties only.
    pub fn new() -> Self {
        Self::default()
    }

    /// A panel that also lists port names.
    pub fn with_port_entries() -> Self {
        PropertyPanel {
            port_entries: true,
            ..Self::default()
        }
    }

    pub fn bound(&self) -> Option<FunctionId> {
        self.bound
    }

    pub fn entries(&self) -> &[PanelEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&PanelEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Binds the panel to `function`, or clears it.
    pub fn bind(&mut self, graph: &ModelGraph, function: Option<FunctionId>) -> Result<(), ViewError> {
        self.entries.clear();
        self.bound = None;
        let Some(id) = function else {
            return Ok(());
        };
        let f = graph.function(id)?;

        for (key, prop) in f.properties.iter() {
            self.entries.push(PanelEntry {
                key: key.clone(),
                label: prop.label.clone(),
                kind: prop.kind.clone(),
                value: prop.value.clone(),
                description: prop.description.clone(),
                target: EntryTarget::Property,
            });
        }

        if self.port_entries {
            for (index, param) in f.parameters.iter().enumerate() {
                self.entries.push(port_entry(
                    format!("inputPort{index}"),
                    format!("Input Port Name{index}"),
                    "name of the parameter",
                    &param.name,
                    NameChangeKind::Parameter,
                    param.id,
                ));
            }
            for (index, ret) in f.return_values.iter().enumerate() {
                self.entries.push(port_entry(
                    format!("outputPort{index}"),
                    format!("Output Port Name{index}"),
                    "name of the return value",
                    &ret.name,
                    NameChangeKind::ReturnValue,
                    ret.id,
                ));
            }
        }

        self.bound = Some(id);
        Ok(())
    }

    /// Turns an edit of entry `key` into the change it stands for. Port
    /// names have spaces replaced by underscores.
    pub fn edit(&self, key: &str, value: Value) -> Result<PanelEdit, ViewError> {
        let function = self.bound.ok_or(ViewError::PanelNotBound)?;
        let entry = self.entry(key).ok_or_else(|| ViewError::UnknownEntry {
            key: key.to_string(),
        })?;

        match &entry.target {
            EntryTarget::Property => Ok(PanelEdit::Property {
                function,
                patch: PropertyPatch::new(key, value),
            }),
            EntryTarget::Port { kind, port } => {
                let name = match &value {
                    Value::String(s) => s.replace(' ', "_"),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                Ok(PanelEdit::Rename {
                    kind: *kind,
                    port: *port,
                    name,
                    parent: function,
                })
            }
        }
    }
}

fn port_entry(
    key: String,
    label: String,
    description: &str,
    name: &str,
    kind: NameChangeKind,
    port: PortId,
) -> PanelEntry {
    PanelEntry {
        key,
        label,
        kind: PropertyKind::String,
        value: if name.is_empty() {
            Value::Null
        } else {
            Value::String(name.to_string())
        },
        description: Some(description.to_string()),
        target: EntryTarget::Port { kind, port },
    }
}

//! The event vocabulary shared by the application, the host and peers.
//!
//! Events are JSON objects tagged by `command`. Requests (`function-select`,
//! `toolbar-command`, `delete`, ...) are raised by the views and handled by
//! the core handler; notifications (`selection-changed`, `port-connected`,
//! ...) are raised by the [`Application`](crate::Application) after it
//! changed the model and are mirrored to the host and to peers.

use grml_core::connection::ConnectionDescriptor;
use grml_core::id::{FunctionId, ModelId, PortId};
use grml_core::serialize::{FunctionSerialization, ModelSerialization};
use grml_view::{NameChangeKind, SelectionMode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Which model to open in the editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenTarget {
    /// A model path, root first. Only meaningful within one instance.
    Path(Vec<ModelId>),
    /// The submodel of a model function, stable across peers.
    Function(FunctionId),
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolbarCommand {
    Add,
    Reset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Event {
    FunctionSelect {
        #[serde(default)]
        function: Option<FunctionId>,
        #[serde(default)]
        mode: SelectionMode,
    },
    SelectionChanged {
        ids: Vec<FunctionId>,
    },
    PropertiesChanged {
        function: FunctionId,
        properties: IndexMap<String, Value>,
    },
    AddFunction {
        function: Box<FunctionSerialization>,
    },
    FunctionChanged {
        function: Box<FunctionSerialization>,
    },
    Remove {
        function: FunctionId,
    },
    NameChange {
        kind: NameChangeKind,
        port: PortId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<FunctionId>,
    },
    PortConnected {
        connection: ConnectionDescriptor,
    },
    OpenSubmodel {
        target: OpenTarget,
    },
    ModelChanged {
        model: Box<ModelSerialization>,
    },
    ModelLoaded {
        model: Box<ModelSerialization>,
    },
    ExecuteCode {
        code: String,
        #[serde(rename = "retValCode", default)]
        ret_val_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<FunctionId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation: Option<Uuid>,
        #[serde(default)]
        stamp: u64,
    },
    KernelIdle {
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation: Option<Uuid>,
    },
    ExecuteFunctions {
        #[serde(default)]
        all: bool,
    },
    ToolbarCommand {
        action: ToolbarCommand,
    },
    RepresentationChange,
    Log {
        #[serde(default)]
        level: LogLevel,
        messages: Vec<String>,
    },
    AppReady,
    Delete,
}

impl Event {
    /// Parses a JSON frame. Unknown commands and malformed frames yield
    /// `None`.
    pub fn parse(frame: &str) -> Option<Event> {
        match serde_json::from_str(frame) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(%err, "ignoring unreadable event frame");
                None
            }
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn command(&self) -> &'static str {
        match self {
            Event::FunctionSelect { .. } => "function-select",
            Event::SelectionChanged { .. } => "selection-changed",
            Event::PropertiesChanged { .. } => "properties-changed",
            Event::AddFunction { .. } => "add-function",
            Event::FunctionChanged { .. } => "function-changed",
            Event::Remove { .. } => "remove",
            Event::NameChange { .. } => "name-change",
            Event::PortConnected { .. } => "port-connected",
            Event::OpenSubmodel { .. } => "open-submodel",
            Event::ModelChanged { .. } => "model-changed",
            Event::ModelLoaded { .. } => "model-loaded",
            Event::ExecuteCode { .. } => "execute-code",
            Event::KernelIdle { .. } => "kernel-idle",
            Event::ExecuteFunctions { .. } => "execute-functions",
            Event::ToolbarCommand { .. } => "toolbar-command",
            Event::RepresentationChange => "representation-change",
            Event::Log { .. } => "log",
            Event::AppReady => "app-ready",
            Event::Delete => "delete",
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Event {
        Event::Log {
            level,
            messages: vec![message.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(Event::parse(r#"{"command":"grml-something-else"}"#), None);
        assert_eq!(Event::parse("not json"), None);
        assert_eq!(Event::parse(r#"{"no":"command"}"#), None);
    }

    #[test]
    fn unit_commands_parse() {
        assert_eq!(Event::parse(r#"{"command":"delete"}"#), Some(Event::Delete));
        assert_eq!(
            Event::parse(r#"{"command":"toolbar-command","action":"RESET"}"#),
            Some(Event::ToolbarCommand {
                action: ToolbarCommand::Reset
            })
        );
    }

    #[test]
    fn select_defaults_to_switch() {
        let id = FunctionId::new();
        let frame = format!(r#"{{"command":"function-select","function":"{id}"}}"#);
        assert_eq!(
            Event::parse(&frame),
            Some(Event::FunctionSelect {
                function: Some(id),
                mode: SelectionMode::Switch,
            })
        );
    }

    #[test]
    fn command_names_match_the_tag() {
        let events = vec![
            Event::Delete,
            Event::AppReady,
            Event::RepresentationChange,
            Event::ExecuteFunctions { all: true },
            Event::log(LogLevel::Warn, "careful"),
            Event::KernelIdle {
                status: "ok".into(),
                correlation: None,
            },
            Event::OpenSubmodel {
                target: OpenTarget::Root,
            },
        ];
        for event in events {
            let value: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
            assert_eq!(value["command"], event.command());
        }
    }

    #[test]
    fn execute_code_uses_wire_field_names() {
        let event = Event::ExecuteCode {
            code: "x = 1".into(),
            ret_val_code: String::new(),
            function: None,
            correlation: None,
            stamp: 3,
        };
        insta::assert_json_snapshot!(event, @r###"
        {
          "command": "execute-code",
          "code": "x = 1",
          "retValCode": "",
          "stamp": 3
        }
        "###);
    }
}

//! Peer synchronization.
//!
//! Local notifications are encoded as event frames for the relay; frames
//! received from the relay are applied to the local model with event
//! emission suppressed, so a peer's change is never echoed back.

use std::any::Any;

use grml_core::connection::ConnectionRequest;

use crate::app::Application;
use crate::bus::Handler;
use crate::error::AppError;
use crate::event::{Event, OpenTarget};

#[derive(Debug, Default)]
pub struct PeerHandler {
    outbound: Vec<String>,
}

impl PeerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbound(&self) -> &[String] {
        &self.outbound
    }

    /// Frames to send to the relay, oldest first.
    pub fn take_outbound(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbound)
    }

    /// Queues the full model for a freshly opened relay connection.
    pub fn on_open(&mut self, app: &Application) -> Result<(), AppError> {
        let model = Box::new(app.serialize_model()?);
        self.send(&Event::ModelChanged { model })
    }

    /// Applies a frame received from a peer. Frames that are not events, or
    /// events peers do not exchange, are ignored.
    pub fn receive(&mut self, app: &mut Application, frame: &str) -> Result<(), AppError> {
        let Some(event) = Event::parse(frame) else {
            return Ok(());
        };
        tracing::debug!(command = event.command(), "peer event");
        app.suppressed(|app| apply(app, event))
    }

    fn send(&mut self, event: &Event) -> Result<(), AppError> {
        self.outbound.push(event.to_frame()?);
        Ok(())
    }
}

fn apply(app: &mut Application, event: Event) -> Result<(), AppError> {
    match event {
        Event::ModelChanged { model } => app.load_model(&model)?,
        Event::Remove { function } => {
            app.remove_function(function)?;
        }
        Event::FunctionChanged { function } => app.update_function(&function)?,
        Event::AddFunction { function } => {
            app.add_serialized_function(&function)?;
        }
        Event::SelectionChanged { ids } => app.set_functions_selected(&ids)?,
        Event::PortConnected { connection } => {
            app.add_connection(ConnectionRequest::from(connection))?;
        }
        Event::NameChange {
            kind,
            port,
            name,
            parent,
        } => {
            app.rename_variable(kind, port, &name, parent)?;
        }
        Event::OpenSubmodel { target } => {
            app.open_submodel(target)?;
        }
        Event::PropertiesChanged {
            function,
            properties,
        } => app.set_properties(function, &properties)?,
        other => {
            tracing::debug!(command = other.command(), "not a peer event");
        }
    }
    Ok(())
}

impl Handler for PeerHandler {
    fn handle(&mut self, app: &mut Application, event: &Event) -> Result<(), AppError> {
        match event {
            Event::ModelLoaded { model } => self.send(&Event::ModelChanged {
                model: model.clone(),
            }),
            Event::OpenSubmodel {
                target: OpenTarget::Path(path),
            } => {
                // model ids are local, peers address a submodel by its owner
                let owner = match path.last() {
                    Some(model) => app.graph().model(*model)?.parent,
                    None => None,
                };
                let target = owner.map(OpenTarget::Function).unwrap_or(OpenTarget::Root);
                self.send(&Event::OpenSubmodel { target })
            }
            Event::ModelChanged { .. }
            | Event::Remove { .. }
            | Event::AddFunction { .. }
            | Event::FunctionChanged { .. }
            | Event::SelectionChanged { .. }
            | Event::PortConnected { .. }
            | Event::NameChange { .. }
            | Event::OpenSubmodel { .. }
            | Event::PropertiesChanged { .. } => self.send(event),
            _ => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use grml_core::builtin::COMPOSITE_NN;

    #[test]
    fn paths_become_function_targets() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let nn = app.add_function(COMPOSITE_NN).unwrap();
        let sub = app.graph().submodel_of(nn).unwrap();
        let root = app.graph().root();
        let mut peer = PeerHandler::new();

        peer.handle(
            &mut app,
            &Event::OpenSubmodel {
                target: OpenTarget::Path(vec![root, sub]),
            },
        )
        .unwrap();
        peer.handle(
            &mut app,
            &Event::OpenSubmodel {
                target: OpenTarget::Path(vec![root]),
            },
        )
        .unwrap();

        let sent: Vec<Event> = peer
            .take_outbound()
            .iter()
            .filter_map(|f| Event::parse(f))
            .collect();
        assert_eq!(
            sent,
            vec![
                Event::OpenSubmodel {
                    target: OpenTarget::Function(nn)
                },
                Event::OpenSubmodel {
                    target: OpenTarget::Root
                },
            ]
        );
    }

    #[test]
    fn requests_stay_local() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let mut peer = PeerHandler::new();
        peer.handle(&mut app, &Event::Delete).unwrap();
        peer.handle(&mut app, &Event::ExecuteFunctions { all: true }).unwrap();
        assert!(peer.outbound().is_empty());
    }

    #[test]
    fn received_changes_are_not_echoed() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let mut peer = PeerHandler::new();
        let remote = {
            let mut other = Application::new(AppConfig::default()).unwrap();
            let nn = other.add_function(COMPOSITE_NN).unwrap();
            other.graph().serialize_function(nn).unwrap()
        };
        let frame = Event::AddFunction {
            function: Box::new(remote.clone()),
        }
        .to_frame()
        .unwrap();

        peer.receive(&mut app, &frame).unwrap();
        assert!(app.graph().contains_function(remote.uuid));
        assert_eq!(app.selection().ids(), &[remote.uuid]);
        assert!(app.take_events().is_empty());
        assert!(!app.is_suppressed());
    }
}

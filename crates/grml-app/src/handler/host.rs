//! The editor host channel.
//!
//! The host owns the kernel. Code requests are queued here and sent one at
//! a time; the host answers each with `kernel-idle`. Structural changes are
//! reported to the host with the full serialized model.

use std::any::Any;

use grml_core::serialize::ModelSerialization;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::Application;
use crate::bus::Handler;
use crate::error::AppError;
use crate::event::{Event, LogLevel};
use crate::execution::{CodeRequest, ExecutionQueue};

/// Messages posted to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum HostMessage {
    #[serde(rename = "kernel-execute-code-request")]
    ExecuteCodeRequest { code: String },
    #[serde(rename = "grml-vsc-model-changed")]
    ModelChanged { model: Box<ModelSerialization> },
    #[serde(rename = "grml-vsc-app-ready")]
    AppReady,
    #[serde(rename = "grml-vsc-log-message")]
    LogMessage { messages: Vec<String>, level: LogLevel },
}

/// Messages received from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum HostInbound {
    #[serde(rename = "grml-vsc-send-model")]
    SendModel { model: Box<ModelSerialization> },
    #[serde(rename = "kernel-idle")]
    KernelIdle {
        status: String,
        #[serde(default)]
        correlation: Option<Uuid>,
    },
}

#[derive(Debug, Default)]
pub struct HostHandler {
    queue: ExecutionQueue,
    outbound: Vec<HostMessage>,
}

impl HostHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    pub fn outbound(&self) -> &[HostMessage] {
        &self.outbound
    }

    /// Messages to post, oldest first.
    pub fn take_outbound(&mut self) -> Vec<HostMessage> {
        std::mem::take(&mut self.outbound)
    }

    /// Applies a message from the host.
    pub fn receive(&mut self, app: &mut Application, message: HostInbound) -> Result<(), AppError> {
        match message {
            HostInbound::SendModel { model } => app.load_model(&model),
            HostInbound::KernelIdle { status, correlation } => {
                self.kernel_idle(app, &status, correlation)
            }
        }
    }

    pub fn receive_json(&mut self, app: &mut Application, json: &str) -> Result<(), AppError> {
        let message: HostInbound = serde_json::from_str(json)?;
        self.receive(app, message)
    }

    fn kernel_idle(
        &mut self,
        app: &mut Application,
        status: &str,
        correlation: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some((function, stamp)) = self.queue.finish(status, correlation) {
            // the function may have been removed while it ran
            if app.graph().contains_function(function) {
                app.mark_computed(function, stamp)?;
            }
        }
        self.dispatch_next(app);
        Ok(())
    }

    fn dispatch_next(&mut self, app: &Application) {
        if let Some(code) = self.queue.next(app.graph()) {
            self.send_code(code);
        }
    }

    fn send_code(&mut self, code: String) {
        tracing::debug!(pending = self.queue.pending(), "sending code to the kernel");
        self.outbound.push(HostMessage::ExecuteCodeRequest { code });
    }

    fn model_changed(&mut self, app: &Application) -> Result<(), AppError> {
        let model = Box::new(app.serialize_model()?);
        self.outbound.push(HostMessage::ModelChanged { model });
        Ok(())
    }
}

impl Handler for HostHandler {
    fn handle(&mut self, app: &mut Application, event: &Event) -> Result<(), AppError> {
        match event {
            Event::ExecuteCode {
                code,
                ret_val_code,
                function,
                correlation,
                stamp,
            } => {
                let request = CodeRequest {
                    code: code.clone(),
                    ret_val_code: ret_val_code.clone(),
                    function: *function,
                    correlation: *correlation,
                    stamp: *stamp,
                };
                if let Some(code) = self.queue.enqueue(request, app.graph()) {
                    self.send_code(code);
                }
            }
            Event::KernelIdle { status, correlation } => {
                self.kernel_idle(app, status, *correlation)?;
            }
            Event::AppReady => self.outbound.push(HostMessage::AppReady),
            Event::Log { level, messages } => self.outbound.push(HostMessage::LogMessage {
                messages: messages.clone(),
                level: *level,
            }),
            Event::AddFunction { .. }
            | Event::Remove { .. }
            | Event::FunctionChanged { .. }
            | Event::PortConnected { .. }
            | Event::NameChange { .. }
            | Event::PropertiesChanged { .. } => self.model_changed(app)?,
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub mod error;
pub mod config;
pub mod event;
pub mod breadcrumb;
pub mod execution;
pub mod app;
pub mod bus;
pub mod handler;

// Re-export commonly used types
pub use error::AppError;
pub use config::AppConfig;
pub use event::{Event, LogLevel, OpenTarget, ToolbarCommand};
pub use breadcrumb::Breadcrumb;
pub use execution::{CodeRequest, ExecutionQueue};
pub use app::{Application, DataRequest};
pub use bus::{EventBus, Handler};
pub use handler::{CoreHandler, HostHandler, HostInbound, HostMessage, PeerHandler};

//! Error type for application operations.

use grml_core::error::CoreError;
use grml_core::id::PortId;
use grml_view::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Function titles are not renamed through name changes.
    #[error("function names can not be changed through a name change")]
    NotRenamable,

    #[error("no function owns port {port}")]
    UnknownPort { port: PortId },

    #[error("invalid value '{value}' for {key}")]
    Config { key: String, value: String },
}

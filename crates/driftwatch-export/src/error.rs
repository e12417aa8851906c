use driftwatch_core::error::{ErrorKind, HasErrorKind};
use driftwatch_router::RouterError;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("plugin '{0}' is not registered")]
    PluginNotFound(String),

    #[error("plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("plugin '{plugin}' rejected its configuration: {message}")]
    InvalidConfig { plugin: String, message: String },

    #[error("export via plugin '{plugin}' timed out after {timeout_ms}ms")]
    Timeout { plugin: String, timeout_ms: u64 },

    #[error("export queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("request '{id}' is not pending and cannot be canceled")]
    NotPending { id: String },

    #[error("request '{0}' was not found")]
    RequestNotFound(String),

    #[error(transparent)]
    Routing(#[from] RouterError),

    #[error("plugin '{plugin}' failed: {message}")]
    PluginFailed { plugin: String, message: String },

    #[error("manager is shutting down")]
    ShuttingDown,
}

impl HasErrorKind for ExportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExportError::PluginNotFound(_) => ErrorKind::NotFound,
            ExportError::RequestNotFound(_) => ErrorKind::NotFound,
            ExportError::AlreadyRegistered(_) => ErrorKind::Conflict,
            ExportError::InvalidConfig { .. } => ErrorKind::Configuration,
            ExportError::Timeout { .. } => ErrorKind::Network,
            ExportError::QueueFull { .. } => ErrorKind::Unavailable,
            ExportError::NotPending { .. } => ErrorKind::Validation,
            ExportError::Routing(e) => e.kind(),
            ExportError::PluginFailed { .. } => ErrorKind::Internal,
            ExportError::ShuttingDown => ErrorKind::Canceled,
        }
    }
}

impl From<driftwatch_bulkhead::BulkheadError> for ExportError {
    fn from(err: driftwatch_bulkhead::BulkheadError) -> Self {
        ExportError::PluginFailed {
            plugin: "worker-pool".to_string(),
            message: err.to_string(),
        }
    }
}

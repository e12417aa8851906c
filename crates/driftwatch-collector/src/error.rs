use driftwatch_core::error::{ErrorKind, HasErrorKind};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CollectorError {
    #[error("collector {collector} rejected its configuration: {message}")]
    InvalidConfig { collector: String, message: String },
    #[error("provider request failed for {resource_type} in {scope}: {message}")]
    ProviderRequest {
        resource_type: String,
        scope: String,
        message: String,
    },
    #[error("no registry entry for resource type {0}")]
    UnknownResourceType(String),
    #[error("authentication failed against provider {provider}: {message}")]
    Auth { provider: String, message: String },
    #[error("permission denied against provider {provider}: {message}")]
    Permission { provider: String, message: String },
    #[error("collection was canceled before completion")]
    Canceled,
}

impl HasErrorKind for CollectorError {
    fn kind(&self) -> ErrorKind {
        match self {
            CollectorError::InvalidConfig { .. } => ErrorKind::Configuration,
            CollectorError::ProviderRequest { .. } => ErrorKind::Network,
            CollectorError::UnknownResourceType(_) => ErrorKind::Validation,
            CollectorError::Auth { .. } => ErrorKind::Auth,
            CollectorError::Permission { .. } => ErrorKind::Permission,
            CollectorError::Canceled => ErrorKind::Canceled,
        }
    }
}

impl From<driftwatch_connection::ConnectionError> for CollectorError {
    fn from(err: driftwatch_connection::ConnectionError) -> Self {
        use driftwatch_connection::ConnectionError;
        match err {
            ConnectionError::Auth { target, message } => CollectorError::Auth {
                provider: target,
                message,
            },
            ConnectionError::Permission { target, message } => CollectorError::Permission {
                provider: target,
                message,
            },
            ConnectionError::Canceled { .. } => CollectorError::Canceled,
            ConnectionError::CircuitOpen { target } => CollectorError::ProviderRequest {
                resource_type: "unknown".into(),
                scope: target,
                message: "circuit open".into(),
            },
            ConnectionError::RateLimited { target } => CollectorError::ProviderRequest {
                resource_type: "unknown".into(),
                scope: target,
                message: "rate limited".into(),
            },
            ConnectionError::Timeout { target, elapsed_ms } => CollectorError::ProviderRequest {
                resource_type: "unknown".into(),
                scope: target,
                message: format!("timed out after {elapsed_ms}ms"),
            },
            ConnectionError::Network { target, message } => CollectorError::ProviderRequest {
                resource_type: "unknown".into(),
                scope: target,
                message,
            },
            ConnectionError::NotRewindable { target } => CollectorError::ProviderRequest {
                resource_type: "unknown".into(),
                scope: target,
                message: "request body not rewindable for retry".into(),
            },
        }
    }
}

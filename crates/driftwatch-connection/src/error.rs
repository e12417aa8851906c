use driftwatch_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// Errors surfaced by the connection layer.
///
/// Transport/timeout failures propagate as `Network`; an open circuit is a
/// distinct `Unavailable` kind rather than being folded into `Network`, so
/// callers can tell "the target is down" from "we're deliberately not
/// calling it right now" apart.
#[derive(Debug, Error, Clone)]
pub enum ConnectionError {
    #[error("target '{target}' is unavailable: circuit is open")]
    CircuitOpen { target: String },

    #[error("rate limited waiting for a token on target '{target}'")]
    RateLimited { target: String },

    #[error("request to '{target}' timed out after {elapsed_ms}ms")]
    Timeout { target: String, elapsed_ms: u64 },

    #[error("transport error calling '{target}': {message}")]
    Network { target: String, message: String },

    #[error("authentication failed calling '{target}': {message}")]
    Auth { target: String, message: String },

    #[error("permission denied calling '{target}': {message}")]
    Permission { target: String, message: String },

    #[error("request body to '{target}' cannot be rewound for retry")]
    NotRewindable { target: String },

    #[error("operation on '{target}' canceled")]
    Canceled { target: String },
}

impl HasErrorKind for ConnectionError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::CircuitOpen { .. } => ErrorKind::Unavailable,
            ConnectionError::RateLimited { .. } => ErrorKind::RateLimited,
            ConnectionError::Timeout { .. } => ErrorKind::Network,
            ConnectionError::Network { .. } => ErrorKind::Network,
            ConnectionError::Auth { .. } => ErrorKind::Auth,
            ConnectionError::Permission { .. } => ErrorKind::Permission,
            ConnectionError::NotRewindable { .. } => ErrorKind::Validation,
            ConnectionError::Canceled { .. } => ErrorKind::Canceled,
        }
    }
}

impl ConnectionError {
    /// Classifies a response status the way the retry wrapper needs to:
    /// 5xx and 429 are retryable, everything else isn't.
    pub fn from_status(target: &str, status: u16) -> Option<Self> {
        match status {
            401 => Some(ConnectionError::Auth {
                target: target.to_string(),
                message: "401 Unauthorized".to_string(),
            }),
            403 => Some(ConnectionError::Permission {
                target: target.to_string(),
                message: "403 Forbidden".to_string(),
            }),
            429 => Some(ConnectionError::RateLimited {
                target: target.to_string(),
            }),
            500..=599 => Some(ConnectionError::Network {
                target: target.to_string(),
                message: format!("server error {status}"),
            }),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectionError::Network { .. } | ConnectionError::Timeout { .. }
        )
    }
}

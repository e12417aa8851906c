//! The error kind taxonomy shared by every driftwatch crate.
//!
//! Every crate defines its own `thiserror` error enum for the errors it can
//! actually produce, but each of those enums reports a [`ErrorKind`] so
//! callers at the CLI boundary can make one decision (which exit code, which
//! remediation hint) without matching on a dozen different concrete types.

use std::fmt;

/// Error kinds, never type names — matches the taxonomy a user or an exit
/// code needs to reason about, independent of which crate raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, DNS, or timeout failure.
    Network,
    /// Invalid or expired credentials.
    Auth,
    /// Valid identity, forbidden action.
    Permission,
    /// Malformed or missing configuration.
    Configuration,
    /// Bad input to an API.
    Validation,
    NotFound,
    /// e.g. duplicate plugin registration.
    Conflict,
    RateLimited,
    /// Circuit open or upstream maintenance.
    Unavailable,
    /// A bug.
    Internal,
    Canceled,
}

impl ErrorKind {
    /// Maps onto the CLI exit codes documented in spec.md §6.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Auth | ErrorKind::Permission => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
            ErrorKind::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// Implemented by every crate's error enum so the taxonomy above is
/// accessible uniformly, without requiring `From` conversions between
/// unrelated error types.
pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}

/// A structured remediation hint attached to user-facing errors, per
/// spec.md §7 ("authentication errors are surfaced with actionable guidance
/// fields").
#[derive(Debug, Clone, Default)]
pub struct RemediationHint {
    pub cause: Option<String>,
    pub suggested_fix: Option<String>,
    pub verify_command: Option<String>,
    pub help_doc_url: Option<String>,
}

impl RemediationHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn verify_command(mut self, cmd: impl Into<String>) -> Self {
        self.verify_command = Some(cmd.into());
        self
    }

    pub fn help_doc_url(mut self, url: impl Into<String>) -> Self {
        self.help_doc_url = Some(url.into());
        self
    }
}

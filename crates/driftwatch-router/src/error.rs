use driftwatch_core::error::{ErrorKind, HasErrorKind};

pub use crate::condition::ConditionCompileError;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    InvalidCondition(#[from] ConditionCompileError),
    #[error("no route matched the request and no default plugin is configured")]
    NoRoute,
}

impl HasErrorKind for RouterError {
    fn kind(&self) -> ErrorKind {
        match self {
            RouterError::InvalidCondition(_) => ErrorKind::Configuration,
            RouterError::NoRoute => ErrorKind::NotFound,
        }
    }
}

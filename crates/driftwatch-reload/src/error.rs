use driftwatch_core::error::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Export(#[from] driftwatch_export::ExportError),

    #[error(transparent)]
    Router(#[from] driftwatch_router::RouterError),
}

impl HasErrorKind for ReloadError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReloadError::Read { .. } => ErrorKind::Configuration,
            ReloadError::Parse { .. } => ErrorKind::Configuration,
            ReloadError::Export(e) => e.kind(),
            ReloadError::Router(e) => e.kind(),
        }
    }
}

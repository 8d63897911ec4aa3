use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single descriptor. Every variant is caught at the
/// descriptor boundary and folded into the run's `OutcomeReport`.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("unknown model: {id}")]
    UnknownModel { id: String },

    #[error("download of {id} failed: {cause:#}")]
    DownloadFailed { id: String, cause: anyhow::Error },

    #[error("extraction of {id} failed: {cause:#}")]
    ExtractionFailed { id: String, cause: anyhow::Error },

    #[error("download of {id} cancelled")]
    Cancelled { id: String },
}

impl ProvisionError {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            ProvisionError::UnknownModel { id }
            | ProvisionError::DownloadFailed { id, .. }
            | ProvisionError::ExtractionFailed { id, .. }
            | ProvisionError::Cancelled { id } => id,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProvisionError::Cancelled { .. })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed reading catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog json could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog contains no models")]
    Empty,

    #[error("duplicate model id in catalog: {id}")]
    Duplicate { id: String },

    #[error("model {id} has an invalid local name {name:?}; expected a single path component")]
    InvalidFilename { id: String, name: String },
}

use thiserror::Error;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Error surface of a training backend.
///
/// The orchestrator retries `Transient` failures within a bounded budget;
/// everything else terminates the job immediately.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

use crate::deploy::ModelId;
use strata_dataset::DatasetError;
use strata_training::{BackendError, ConfigValidation, JobStatus, TrainingJobId};
use thiserror::Error;

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;

/// Orchestration errors.
///
/// `InvalidConfiguration` is the synchronous, client-correctable class;
/// backend failures never surface here — they are captured into job state
/// and discovered through the status surface.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Configuration failed validation; carries the full issue list.
    #[error("invalid training configuration: {summary}")]
    InvalidConfiguration {
        summary: String,
        validation: ConfigValidation,
    },

    #[error("training job not found: {0}")]
    JobNotFound(TrainingJobId),

    #[error("training job {id} is not completed (status: {status})")]
    JobNotCompleted { id: TrainingJobId, status: JobStatus },

    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("training job {id} is already terminal ({status})")]
    JobAlreadyTerminal { id: TrainingJobId, status: JobStatus },

    #[error("a model named '{name}' is already deployed for this owner")]
    DuplicateModelName { name: String },

    #[error("model not deployed: {0}")]
    ModelNotDeployed(ModelId),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

//! Training job record and status machine.

use crate::backend::ModelArtifact;
use crate::config::TrainingConfiguration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_dataset::DatasetId;
use uuid::Uuid;

/// Identifier for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Job lifecycle state.
///
/// `Completed` and `Failed` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Preprocessing,
    Training,
    Evaluating,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Checks whether the status machine permits a transition.
    ///
    /// The happy path is strictly forward; `Failed` is reachable from
    /// every non-terminal state.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            (Self::Queued, Self::Preprocessing | Self::Failed)
            | (Self::Preprocessing, Self::Training | Self::Failed)
            | (Self::Training, Self::Evaluating | Self::Failed)
            | (Self::Evaluating, Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Preprocessing => "preprocessing",
            Self::Training => "training",
            Self::Evaluating => "evaluating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Evaluation metrics of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub class_names: Vec<String>,
}

/// One asynchronous execution of training against a fixed configuration
/// snapshot.
///
/// The record is owned exclusively by the orchestrator until terminal and
/// read-only to everyone else afterwards. `metrics` is present iff the
/// job completed; `error_message` iff it failed. The artifact is internal
/// hand-off material for the deployment manager and never appears in
/// status snapshots.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub id: TrainingJobId,
    pub dataset_id: DatasetId,
    pub configuration: TrainingConfiguration,
    pub status: JobStatus,
    /// 0..=100, monotonically non-decreasing within a run; exactly 100
    /// only at `Completed`.
    pub progress: u8,
    pub current_step: String,
    pub metrics: Option<JobMetrics>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped on every externally visible mutation; backs the reporter's
    /// no-change fast path.
    pub revision: u64,
    pub artifact: Option<ModelArtifact>,
}

impl TrainingJob {
    /// Creates a queued job from an accepted configuration snapshot.
    #[must_use]
    pub fn new(dataset_id: DatasetId, configuration: TrainingConfiguration) -> Self {
        Self {
            id: TrainingJobId::new(),
            dataset_id,
            configuration,
            status: JobStatus::Queued,
            progress: 0,
            current_step: "Queued".to_string(),
            metrics: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            revision: 0,
            artifact: None,
        }
    }
}

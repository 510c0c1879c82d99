//! Status delivery for external observers.
//!
//! The reporter is the polling contract between the orchestrator and any
//! UI or script. Reads clone one consistent record snapshot under the
//! read lock — a caller is never blocked longer than one atomic record
//! update and never sees partially-applied fields. Polling frequency is
//! the client's policy; the revision fast path makes high-frequency
//! polling cheap.

use crate::error::OrchestratorResult;
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_dataset::DatasetId;
use strata_training::{JobMetrics, JobStatus, TrainingJob, TrainingJobId};

/// Externally visible state of one training job.
///
/// `metrics` is present only for completed jobs and `error_message` only
/// for failed ones; the model artifact is never part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: TrainingJobId,
    pub dataset_id: DatasetId,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<JobMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl From<&TrainingJob> for JobSnapshot {
    fn from(job: &TrainingJob) -> Self {
        Self {
            id: job.id.clone(),
            dataset_id: job.dataset_id.clone(),
            status: job.status,
            progress: job.progress,
            current_step: job.current_step.clone(),
            // Metrics only ever leave the record on the completed path.
            metrics: (job.status == JobStatus::Completed)
                .then(|| job.metrics.clone())
                .flatten(),
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            revision: job.revision,
        }
    }
}

/// Read-side view over the job store.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    store: JobStore,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// Returns a consistent snapshot of the job. Idempotent: two calls
    /// with no intervening mutation return identical snapshots.
    pub async fn get_status(&self, job_id: &TrainingJobId) -> OrchestratorResult<JobSnapshot> {
        let job = self.store.get(job_id).await?;
        Ok(JobSnapshot::from(&job))
    }

    /// The "no change since revision X" fast path: returns `None` when
    /// the record has not been mutated since the given revision.
    pub async fn get_status_if_changed(
        &self,
        job_id: &TrainingJobId,
        since_revision: u64,
    ) -> OrchestratorResult<Option<JobSnapshot>> {
        let job = self.store.get(job_id).await?;
        if job.revision == since_revision {
            return Ok(None);
        }
        Ok(Some(JobSnapshot::from(&job)))
    }
}

//! Shared job records under single-writer discipline.
//!
//! Every mutation flows through [`JobStore::update`], which holds the
//! write lock for one atomic record update, enforces the status machine
//! and progress monotonicity, and bumps the revision counter. Readers
//! clone snapshots under the read lock and are never blocked longer than
//! one such update.

use crate::error::{OrchestratorError, OrchestratorResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use strata_training::{JobMetrics, JobStatus, ModelArtifact, TrainingJob, TrainingJobId};
use tokio::sync::RwLock;
use tracing::{debug, error};

#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<TrainingJobId, TrainingJob>>>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly created job record.
    pub async fn insert(&self, job: TrainingJob) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job);
    }

    /// Clones a consistent snapshot of the record.
    pub async fn get(&self, id: &TrainingJobId) -> OrchestratorResult<TrainingJob> {
        let jobs = self.jobs.read().await;
        jobs.get(id).cloned().ok_or_else(|| OrchestratorError::JobNotFound(id.clone()))
    }

    /// The single mutation entry point.
    ///
    /// Rejects status changes the machine does not permit, clamps
    /// `progress` to be non-decreasing, and bumps `revision` so pollers
    /// observe updates in the order they were produced.
    pub async fn update<F>(&self, id: &TrainingJobId, mutate: F) -> OrchestratorResult<TrainingJob>
    where
        F: FnOnce(&mut TrainingJob),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or_else(|| OrchestratorError::JobNotFound(id.clone()))?;

        // Terminal records are read-only to everyone, the owner included.
        if job.status.is_terminal() {
            return Err(OrchestratorError::JobAlreadyTerminal {
                id: id.clone(),
                status: job.status,
            });
        }

        let previous = job.clone();
        mutate(job);

        if job.status != previous.status && !previous.status.can_transition_to(job.status) {
            error!(
                job_id = %id,
                from = %previous.status,
                to = %job.status,
                "Illegal status transition"
            );
            let attempted = job.status;
            *job = previous;
            return Err(OrchestratorError::IllegalTransition {
                from: job.status,
                to: attempted,
            });
        }
        if job.progress < previous.progress {
            job.progress = previous.progress;
        }
        job.revision = previous.revision + 1;

        debug!(
            job_id = %id,
            status = %job.status,
            progress = job.progress,
            revision = job.revision,
            "Job record updated"
        );
        Ok(job.clone())
    }

    /// Advances the lifecycle phase with its entry milestone.
    pub async fn transition(
        &self,
        id: &TrainingJobId,
        status: JobStatus,
        progress: u8,
        step: &str,
    ) -> OrchestratorResult<TrainingJob> {
        self.update(id, |job| {
            if job.status == JobStatus::Queued && job.started_at.is_none() {
                job.started_at = Some(Utc::now());
            }
            job.status = status;
            job.progress = progress;
            job.current_step = step.to_string();
        })
        .await
    }

    /// Updates the within-phase milestone without a status change.
    pub async fn set_step(
        &self,
        id: &TrainingJobId,
        progress: u8,
        step: &str,
    ) -> OrchestratorResult<TrainingJob> {
        self.update(id, |job| {
            job.progress = progress;
            job.current_step = step.to_string();
        })
        .await
    }

    /// Records the terminal success state: exactly 100 progress, metrics,
    /// and the artifact hand-off for deployment.
    pub async fn complete(
        &self,
        id: &TrainingJobId,
        metrics: JobMetrics,
        artifact: ModelArtifact,
    ) -> OrchestratorResult<TrainingJob> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.current_step = "Training completed".to_string();
            job.metrics = Some(metrics);
            job.artifact = Some(artifact);
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    /// Records the terminal failure state; partial metrics and artifacts
    /// are discarded, `current_step` is left as the last phase milestone.
    pub async fn fail(&self, id: &TrainingJobId, message: &str) -> OrchestratorResult<TrainingJob> {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(message.to_string());
            job.metrics = None;
            job.artifact = None;
            job.completed_at = Some(Utc::now());
        })
        .await
    }
}

//! Training job orchestration.
//!
//! One background tokio task per accepted job drives the lifecycle
//! queued → preprocessing → training → evaluating → completed, with
//! `failed` reachable from every non-terminal state. The spawned task is
//! the only writer of its job record; observers read through the
//! [`crate::reporter::ProgressReporter`]. Submission is fire-and-forget:
//! backend failures are captured into job state, never returned to the
//! submitting caller.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::store::JobStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strata_dataset::{DatasetId, DatasetStore};
use strata_training::{
    validate, BackendError, JobStatus, TrainingBackend, TrainingConfiguration, TrainingJob,
    TrainingJobId, TrainingRequest,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Message recorded for cooperative cancellation.
const CANCELLED_MESSAGE: &str = "cancelled by user";

/// Phase-scaled progress spans. Each phase owns a half-open band so the
/// externally observed progress is monotone across phase boundaries and
/// reaches exactly 100 only at `Completed`.
mod span {
    pub const PREPROCESSING_ENTER: u8 = 5;
    pub const PREPROCESSING_DONE: u8 = 18;
    pub const TRAINING_ENTER: u8 = 20;
    pub const TRAINING_DONE: u8 = 80;
    pub const EVALUATING_ENTER: u8 = 85;
    pub const EVALUATING_DONE: u8 = 95;
}

/// Bounded retry for transient backend failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    /// Base backoff, doubled on every retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, backoff: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn delay(&self, retry_index: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(retry_index)
    }
}

/// Owns the `TrainingJob` state machine.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: JobStore,
    datasets: DatasetStore,
    backend: Arc<dyn TrainingBackend>,
    retry: RetryPolicy,
    cancellations: Arc<RwLock<HashMap<TrainingJobId, CancellationToken>>>,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("backend", &self.backend.id())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl JobOrchestrator {
    #[must_use]
    pub fn new(datasets: DatasetStore, backend: Arc<dyn TrainingBackend>) -> Self {
        Self::with_retry_policy(datasets, backend, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry_policy(
        datasets: DatasetStore,
        backend: Arc<dyn TrainingBackend>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store: JobStore::new(),
            datasets,
            backend,
            retry,
            cancellations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The job records this orchestrator writes; share it with the
    /// reporter and the deployment manager.
    #[must_use]
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Accepts a configuration and schedules its execution.
    ///
    /// Callers are expected to have validated the configuration already;
    /// this re-validates defensively and rejects with the full issue list
    /// if the invariant was broken upstream. On success the job runs in
    /// the background and failures are discovered via the status surface.
    pub async fn submit(
        &self,
        dataset_id: DatasetId,
        configuration: TrainingConfiguration,
    ) -> OrchestratorResult<TrainingJobId> {
        let dataset = self.datasets.get(&dataset_id).await?;

        let validation = validate(&configuration, &dataset.profiles);
        if !validation.is_valid {
            let summary = validation
                .errors()
                .next()
                .map_or_else(|| "rejected".to_string(), |issue| issue.message.clone());
            return Err(OrchestratorError::InvalidConfiguration { summary, validation });
        }

        let job = TrainingJob::new(dataset_id, configuration);
        let job_id = job.id.clone();
        self.store.insert(job).await;

        let token = CancellationToken::new();
        self.cancellations.write().await.insert(job_id.clone(), token.clone());

        let worker = Worker {
            store: self.store.clone(),
            backend: Arc::clone(&self.backend),
            retry: self.retry,
            dataset,
            job_id: job_id.clone(),
            token,
        };
        let cancellations = Arc::clone(&self.cancellations);
        tokio::spawn(async move {
            let job_id = worker.job_id.clone();
            worker.run().await;
            cancellations.write().await.remove(&job_id);
        });

        info!(job_id = %job_id, "Training job accepted");
        Ok(job_id)
    }

    /// Requests cooperative cancellation.
    ///
    /// Advisory: the running task observes the request at its next phase
    /// boundary and fails the job with a distinguishing message. On an
    /// already-terminal job this is a no-op.
    pub async fn cancel(&self, job_id: &TrainingJobId) -> OrchestratorResult<()> {
        if let Some(token) = self.cancellations.read().await.get(job_id) {
            info!(job_id = %job_id, "Cancellation requested");
            token.cancel();
            return Ok(());
        }
        // No live execution: the id must at least refer to a known job.
        self.store.get(job_id).await.map(|_| ())
    }
}

/// The single execution context of one job.
struct Worker {
    store: JobStore,
    backend: Arc<dyn TrainingBackend>,
    retry: RetryPolicy,
    dataset: Arc<strata_dataset::StoredDataset>,
    job_id: TrainingJobId,
    token: CancellationToken,
}

impl Worker {
    async fn run(self) {
        if let Err(message) = self.execute().await {
            match self.store.fail(&self.job_id, &message).await {
                Ok(_) => warn!(job_id = %self.job_id, error = %message, "Training job failed"),
                Err(e) => {
                    error!(job_id = %self.job_id, error = %e, "Failed to record job failure");
                }
            }
        }
    }

    /// Drives the happy path; any `Err` is the terminal failure message.
    async fn execute(&self) -> Result<(), String> {
        let job = self.store.get(&self.job_id).await.map_err(|e| e.to_string())?;
        let request = TrainingRequest {
            job_id: self.job_id.clone(),
            configuration: job.configuration,
            dataset: Arc::clone(&self.dataset),
        };

        self.checkpoint()?;
        self.store
            .transition(
                &self.job_id,
                JobStatus::Preprocessing,
                span::PREPROCESSING_ENTER,
                "Loading dataset",
            )
            .await
            .map_err(|e| e.to_string())?;
        let prepared = self
            .with_retry("Preprocessing", || self.backend.preprocess(&request))
            .await
            .map_err(|e| e.to_string())?;
        self.store
            .set_step(
                &self.job_id,
                span::PREPROCESSING_DONE,
                &format!(
                    "Prepared {} rows ({} dropped)",
                    prepared.rows_used, prepared.rows_dropped
                ),
            )
            .await
            .map_err(|e| e.to_string())?;

        self.checkpoint()?;
        self.store
            .transition(&self.job_id, JobStatus::Training, span::TRAINING_ENTER, "Fitting model")
            .await
            .map_err(|e| e.to_string())?;
        let artifact = self
            .with_retry("Training", || self.backend.train(&request, &prepared))
            .await
            .map_err(|e| e.to_string())?;
        self.store
            .set_step(&self.job_id, span::TRAINING_DONE, "Model fitted")
            .await
            .map_err(|e| e.to_string())?;

        self.checkpoint()?;
        self.store
            .transition(
                &self.job_id,
                JobStatus::Evaluating,
                span::EVALUATING_ENTER,
                "Scoring holdout split",
            )
            .await
            .map_err(|e| e.to_string())?;
        let metrics = self
            .with_retry("Evaluation", || self.backend.evaluate(&request, &artifact))
            .await
            .map_err(|e| e.to_string())?;
        self.store
            .set_step(&self.job_id, span::EVALUATING_DONE, "Evaluation finished")
            .await
            .map_err(|e| e.to_string())?;

        self.store
            .complete(&self.job_id, metrics, artifact)
            .await
            .map_err(|e| e.to_string())?;
        info!(job_id = %self.job_id, "Training job completed");
        Ok(())
    }

    /// Phase-boundary cancellation check.
    fn checkpoint(&self) -> Result<(), String> {
        if self.token.is_cancelled() {
            return Err(CANCELLED_MESSAGE.to_string());
        }
        Ok(())
    }

    /// Runs one backend phase call, retrying transient failures within
    /// the bounded budget. Attempt counts and budget exhaustion surface
    /// in `current_step` so pollers can observe them.
    async fn with_retry<T, Fut>(
        &self,
        phase: &str,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T, BackendError>
    where
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let attempts = self.retry.attempts();
        let mut retry_index = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retry_index < self.retry.max_retries => {
                    let delay = self.retry.delay(retry_index);
                    retry_index += 1;
                    warn!(
                        job_id = %self.job_id,
                        phase,
                        attempt = retry_index + 1,
                        error = %err,
                        "Transient backend error, retrying"
                    );
                    let step = format!(
                        "{phase} hit a transient error; retrying (attempt {} of {attempts})",
                        retry_index + 1
                    );
                    if let Ok(job) = self.store.get(&self.job_id).await {
                        let _ = self.store.set_step(&self.job_id, job.progress, &step).await;
                    }
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        // Budget exhausted; make that visible before the
                        // terminal failure is recorded.
                        let step =
                            format!("{phase} retry budget exhausted after {attempts} attempts");
                        if let Ok(job) = self.store.get(&self.job_id).await {
                            let _ = self.store.set_step(&self.job_id, job.progress, &step).await;
                        }
                    }
                    return Err(err);
                }
            }
        }
    }
}

//! The typed facade consumed by UI and scripts.
//!
//! One method per collaborator operation; transport framing is left to
//! the hosting process. Training start is fire-and-forget: a successful
//! call returns a job id and every later failure is discovered through
//! the status surface, never through the submitting call.

use crate::deploy::{DeploymentManager, DeploymentRecord, ModelId, PredictionResponse};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::{JobOrchestrator, RetryPolicy};
use crate::reporter::{JobSnapshot, ProgressReporter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strata_dataset::{
    ColumnProfile, DatasetId, DatasetStore, DatasetSummary, PreviewPage, RawTable,
};
use strata_training::{
    validate, Algorithm, BackendError, ConfigValidation, JobStatus, PredictionInput,
    PreprocessingConfig, TrainingBackend, TrainingConfiguration, TrainingJobId,
};
use tracing::info;

/// Payload of the start-training operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTrainingRequest {
    pub project_id: String,
    pub dataset_id: DatasetId,
    pub target_column: String,
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub algorithm: Option<Algorithm>,
    #[serde(default)]
    pub test_size: Option<f64>,
    #[serde(default)]
    pub random_state: Option<u64>,
    #[serde(default)]
    pub preprocessing: Option<PreprocessingConfig>,
}

impl StartTrainingRequest {
    fn into_parts(self) -> (String, DatasetId, TrainingConfiguration) {
        let mut configuration =
            TrainingConfiguration::new(self.target_column, self.feature_columns);
        if let Some(algorithm) = self.algorithm {
            configuration.model.algorithm = algorithm;
        }
        if let Some(test_size) = self.test_size {
            configuration.model.test_size = test_size;
        }
        if let Some(random_state) = self.random_state {
            configuration.model.random_state = random_state;
        }
        if let Some(preprocessing) = self.preprocessing {
            configuration.preprocessing = preprocessing;
        }
        (self.project_id, self.dataset_id, configuration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTrainingResponse {
    pub job_id: TrainingJobId,
}

/// Full results of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResults {
    pub id: TrainingJobId,
    pub status: JobStatus,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub class_names: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub training_time_secs: Option<f64>,
}

/// Wires the dataset registry, orchestrator, reporter, and deployment
/// manager into the platform's collaborator surface.
#[derive(Debug)]
pub struct PlatformService {
    datasets: DatasetStore,
    orchestrator: JobOrchestrator,
    reporter: ProgressReporter,
    deployments: DeploymentManager,
}

impl PlatformService {
    #[must_use]
    pub fn new(backend: Arc<dyn TrainingBackend>) -> Self {
        Self::with_retry_policy(backend, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry_policy(backend: Arc<dyn TrainingBackend>, retry: RetryPolicy) -> Self {
        let datasets = DatasetStore::new();
        let orchestrator =
            JobOrchestrator::with_retry_policy(datasets.clone(), Arc::clone(&backend), retry);
        let store = orchestrator.store().clone();
        Self {
            datasets,
            reporter: ProgressReporter::new(store.clone()),
            deployments: DeploymentManager::new(store, backend),
            orchestrator,
        }
    }

    // ----- dataset surface -----

    /// Registers an uploaded table; columns are profiled exactly once.
    pub async fn register_dataset(
        &self,
        name: &str,
        table: RawTable,
    ) -> OrchestratorResult<DatasetSummary> {
        Ok(self.datasets.register(name, table).await?)
    }

    pub async fn dataset_columns(
        &self,
        dataset_id: &DatasetId,
    ) -> OrchestratorResult<Vec<ColumnProfile>> {
        Ok(self.datasets.profiles(dataset_id).await?)
    }

    pub async fn dataset_preview(
        &self,
        dataset_id: &DatasetId,
        rows_per_page: usize,
        page: usize,
    ) -> OrchestratorResult<PreviewPage> {
        Ok(self.datasets.preview(dataset_id, rows_per_page, page).await?)
    }

    pub async fn delete_dataset(&self, dataset_id: &DatasetId) -> OrchestratorResult<()> {
        Ok(self.datasets.remove(dataset_id).await?)
    }

    /// Synchronous validation for the configuration UI; no side effects.
    pub async fn validate_configuration(
        &self,
        dataset_id: &DatasetId,
        configuration: &TrainingConfiguration,
    ) -> OrchestratorResult<ConfigValidation> {
        let profiles = self.datasets.profiles(dataset_id).await?;
        Ok(validate(configuration, &profiles))
    }

    // ----- training surface -----

    /// Validates and schedules a training job.
    ///
    /// Rejects with `InvalidConfiguration` (the 422-class path) and the
    /// full issue list when validation fails; otherwise the job runs in
    /// the background.
    pub async fn start_training(
        &self,
        request: StartTrainingRequest,
    ) -> OrchestratorResult<StartTrainingResponse> {
        let (project_id, dataset_id, configuration) = request.into_parts();
        let job_id = self.orchestrator.submit(dataset_id, configuration).await?;
        info!(job_id = %job_id, project_id = %project_id, "Training started");
        Ok(StartTrainingResponse { job_id })
    }

    pub async fn training_status(
        &self,
        job_id: &TrainingJobId,
    ) -> OrchestratorResult<JobSnapshot> {
        self.reporter.get_status(job_id).await
    }

    pub async fn training_status_if_changed(
        &self,
        job_id: &TrainingJobId,
        since_revision: u64,
    ) -> OrchestratorResult<Option<JobSnapshot>> {
        self.reporter.get_status_if_changed(job_id, since_revision).await
    }

    /// Full metrics of a completed job.
    ///
    /// # Errors
    /// `JobNotCompleted` for any non-completed status.
    pub async fn training_results(
        &self,
        job_id: &TrainingJobId,
    ) -> OrchestratorResult<TrainingResults> {
        let snapshot = self.reporter.get_status(job_id).await?;
        if snapshot.status != JobStatus::Completed {
            return Err(OrchestratorError::JobNotCompleted {
                id: job_id.clone(),
                status: snapshot.status,
            });
        }
        let metrics = snapshot.metrics.ok_or_else(|| {
            OrchestratorError::Backend(BackendError::Fatal(
                "completed job is missing its metrics".to_string(),
            ))
        })?;

        let training_time_secs = match (snapshot.started_at, snapshot.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        };
        Ok(TrainingResults {
            id: snapshot.id,
            status: snapshot.status,
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1_score: metrics.f1_score,
            confusion_matrix: metrics.confusion_matrix,
            class_names: metrics.class_names,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            training_time_secs,
        })
    }

    /// Requests cooperative cancellation of a running job.
    pub async fn cancel_training(&self, job_id: &TrainingJobId) -> OrchestratorResult<()> {
        self.orchestrator.cancel(job_id).await
    }

    // ----- deployment surface -----

    pub async fn deploy_model(
        &self,
        job_id: &TrainingJobId,
        owner: &str,
        model_name: &str,
    ) -> OrchestratorResult<DeploymentRecord> {
        self.deployments.deploy(job_id, owner, model_name).await
    }

    pub async fn undeploy_model(&self, model_id: &ModelId) -> OrchestratorResult<()> {
        self.deployments.undeploy(model_id).await
    }

    pub async fn predict(
        &self,
        model_id: &ModelId,
        input: &PredictionInput,
    ) -> OrchestratorResult<PredictionResponse> {
        self.deployments.predict(model_id, input).await
    }
}

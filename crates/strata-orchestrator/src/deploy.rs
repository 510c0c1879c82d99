//! Deployment of completed models as prediction endpoints.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use strata_training::{
    BackendError, JobStatus, ModelArtifact, PredictionInput, TrainingBackend, TrainingJobId,
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifier for a deployed model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Active,
    Undeployed,
}

/// A completed job exposed as a named, invokable prediction endpoint.
///
/// Exists only for jobs whose terminal status is `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub model_id: ModelId,
    pub job_id: TrainingJobId,
    pub owner: String,
    pub model_name: String,
    pub api_endpoint: String,
    pub deployed_at: DateTime<Utc>,
    pub status: DeploymentStatus,
    pub prediction_count: u64,
}

/// Prediction result as served from the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: f64,
    pub processing_time_ms: f64,
}

struct Deployment {
    record: DeploymentRecord,
    artifact: ModelArtifact,
}

/// Manages the deployed-model registry.
pub struct DeploymentManager {
    jobs: JobStore,
    backend: Arc<dyn TrainingBackend>,
    deployments: Arc<RwLock<HashMap<ModelId, Deployment>>>,
}

impl std::fmt::Debug for DeploymentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentManager")
            .field(
                "deployment_count",
                &self.deployments.try_read().map(|d| d.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl DeploymentManager {
    #[must_use]
    pub fn new(jobs: JobStore, backend: Arc<dyn TrainingBackend>) -> Self {
        Self { jobs, backend, deployments: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Deploys a completed job's model under a per-owner unique name.
    ///
    /// # Errors
    /// `JobNotCompleted` unless the job's terminal status is `completed`;
    /// `DuplicateModelName` when the name collides with another active
    /// deployment of the same owner.
    pub async fn deploy(
        &self,
        job_id: &TrainingJobId,
        owner: &str,
        model_name: &str,
    ) -> OrchestratorResult<DeploymentRecord> {
        let job = self.jobs.get(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(OrchestratorError::JobNotCompleted {
                id: job_id.clone(),
                status: job.status,
            });
        }
        let artifact = job.artifact.ok_or_else(|| {
            OrchestratorError::Backend(BackendError::Fatal(
                "completed job is missing its model artifact".to_string(),
            ))
        })?;

        let mut deployments = self.deployments.write().await;
        let collision = deployments.values().any(|d| {
            d.record.status == DeploymentStatus::Active
                && d.record.owner == owner
                && d.record.model_name == model_name
        });
        if collision {
            return Err(OrchestratorError::DuplicateModelName { name: model_name.to_string() });
        }

        let model_id = ModelId::new();
        let record = DeploymentRecord {
            model_id: model_id.clone(),
            job_id: job_id.clone(),
            owner: owner.to_string(),
            model_name: model_name.to_string(),
            api_endpoint: format!("/models/{model_id}/predict"),
            deployed_at: Utc::now(),
            status: DeploymentStatus::Active,
            prediction_count: 0,
        };
        deployments.insert(model_id.clone(), Deployment { record: record.clone(), artifact });

        info!(model_id = %model_id, job_id = %job_id, model_name, "Model deployed");
        Ok(record)
    }

    /// Deactivates a deployment. Idempotent: succeeds when the model is
    /// already undeployed or was never deployed.
    pub async fn undeploy(&self, model_id: &ModelId) -> OrchestratorResult<()> {
        let mut deployments = self.deployments.write().await;
        if let Some(deployment) = deployments.get_mut(model_id) {
            if deployment.record.status == DeploymentStatus::Active {
                deployment.record.status = DeploymentStatus::Undeployed;
                info!(model_id = %model_id, "Model undeployed");
            }
        }
        Ok(())
    }

    /// Classifies one input against an active deployment.
    pub async fn predict(
        &self,
        model_id: &ModelId,
        input: &PredictionInput,
    ) -> OrchestratorResult<PredictionResponse> {
        let artifact = {
            let deployments = self.deployments.read().await;
            let deployment = deployments
                .get(model_id)
                .filter(|d| d.record.status == DeploymentStatus::Active)
                .ok_or_else(|| OrchestratorError::ModelNotDeployed(model_id.clone()))?;
            deployment.artifact.clone()
        };

        let started = Instant::now();
        let outcome = self.backend.predict(&artifact, input).await?;
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut deployments = self.deployments.write().await;
        if let Some(deployment) = deployments.get_mut(model_id) {
            deployment.record.prediction_count += 1;
        }
        debug!(
            model_id = %model_id,
            prediction = %outcome.label,
            confidence = outcome.confidence,
            "Prediction served"
        );

        Ok(PredictionResponse {
            prediction: outcome.label,
            confidence: outcome.confidence,
            processing_time_ms,
        })
    }
}

//! Training backend abstraction.
//!
//! The orchestrator drives backends through this trait, one phase method
//! per lifecycle phase, so that phase boundaries (and therefore
//! cancellation and retry points) stay under orchestrator control. Phase
//! payloads are opaque to the orchestrator.

use crate::config::TrainingConfiguration;
use crate::error::BackendResult;
use crate::job::{JobMetrics, TrainingJobId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use strata_dataset::StoredDataset;

/// Everything a backend needs to run one job: the configuration snapshot
/// and the profiled dataset.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    pub job_id: TrainingJobId,
    pub configuration: TrainingConfiguration,
    pub dataset: Arc<StoredDataset>,
}

/// Output of the preprocessing phase. `payload` is backend-private.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedData {
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub payload: Value,
}

/// A fitted model as handed to the deployment manager. `payload` is
/// backend-private; `class_names` is surfaced in results and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub backend_id: String,
    pub class_names: Vec<String>,
    pub payload: Value,
}

/// One prediction request: column name to raw value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionInput {
    pub fields: HashMap<String, Value>,
}

impl PredictionInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }
}

/// Backend-level prediction result; the deployment manager adds timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub label: String,
    /// Normalized class probability of the winning label, in [0, 1].
    pub confidence: f64,
}

/// The actual ML computation, treated as a black box by the orchestrator.
///
/// Implementations must be safe to call from concurrent jobs; any
/// per-job state travels through the phase payloads.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Stable backend identifier recorded on artifacts.
    fn id(&self) -> &'static str;

    /// Cleans and assembles the training corpus.
    async fn preprocess(&self, request: &TrainingRequest) -> BackendResult<PreparedData>;

    /// Fits a model on the prepared data.
    async fn train(
        &self,
        request: &TrainingRequest,
        data: &PreparedData,
    ) -> BackendResult<ModelArtifact>;

    /// Scores the fitted model on the holdout split.
    async fn evaluate(
        &self,
        request: &TrainingRequest,
        artifact: &ModelArtifact,
    ) -> BackendResult<JobMetrics>;

    /// Classifies one input against a fitted model.
    async fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &PredictionInput,
    ) -> BackendResult<PredictionOutcome>;
}

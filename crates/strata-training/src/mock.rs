//! Test doubles for backend failure injection.

use crate::backend::{
    ModelArtifact, PredictionInput, PredictionOutcome, PreparedData, TrainingBackend,
    TrainingRequest,
};
use crate::error::{BackendError, BackendResult};
use crate::job::JobMetrics;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Phase into which `FlakyBackend` injects failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlakyPhase {
    Preprocess,
    Train,
    Evaluate,
}

/// Wraps a backend and fails the chosen phase with a transient error a
/// configured number of times before delegating normally. Used to
/// exercise the orchestrator's retry budget.
pub struct FlakyBackend {
    inner: Arc<dyn TrainingBackend>,
    phase: FlakyPhase,
    remaining: AtomicUsize,
}

impl FlakyBackend {
    #[must_use]
    pub fn new(inner: Arc<dyn TrainingBackend>, phase: FlakyPhase, failures: usize) -> Self {
        Self { inner, phase, remaining: AtomicUsize::new(failures) }
    }

    fn take_failure(&self, phase: FlakyPhase) -> Option<BackendError> {
        if phase != self.phase {
            return None;
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| BackendError::Transient("injected transient failure".to_string()))
    }
}

#[async_trait]
impl TrainingBackend for FlakyBackend {
    fn id(&self) -> &'static str {
        "flaky"
    }

    async fn preprocess(&self, request: &TrainingRequest) -> BackendResult<PreparedData> {
        if let Some(err) = self.take_failure(FlakyPhase::Preprocess) {
            return Err(err);
        }
        self.inner.preprocess(request).await
    }

    async fn train(
        &self,
        request: &TrainingRequest,
        data: &PreparedData,
    ) -> BackendResult<ModelArtifact> {
        if let Some(err) = self.take_failure(FlakyPhase::Train) {
            return Err(err);
        }
        self.inner.train(request, data).await
    }

    async fn evaluate(
        &self,
        request: &TrainingRequest,
        artifact: &ModelArtifact,
    ) -> BackendResult<JobMetrics> {
        if let Some(err) = self.take_failure(FlakyPhase::Evaluate) {
            return Err(err);
        }
        self.inner.evaluate(request, artifact).await
    }

    async fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &PredictionInput,
    ) -> BackendResult<PredictionOutcome> {
        self.inner.predict(artifact, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive_bayes::NaiveBayesBackend;
    use crate::{TrainingConfiguration, TrainingJobId};
    use chrono::Utc;
    use serde_json::json;
    use strata_dataset::{profile_table, DatasetId, RawTable, StoredDataset};

    fn request() -> TrainingRequest {
        let table = RawTable::new(
            vec!["text".to_string(), "label".to_string()],
            (0..10)
                .map(|i| {
                    vec![
                        json!(if i % 2 == 0 { "alpha beta" } else { "gamma delta" }),
                        json!(if i % 2 == 0 { "a" } else { "b" }),
                    ]
                })
                .collect(),
        );
        let profiles = profile_table(&table).unwrap();
        TrainingRequest {
            job_id: TrainingJobId::new(),
            configuration: TrainingConfiguration::new("label", vec!["text".to_string()]),
            dataset: std::sync::Arc::new(StoredDataset {
                id: DatasetId::new(),
                name: "t".to_string(),
                table,
                profiles,
                registered_at: Utc::now(),
            }),
        }
    }

    #[tokio::test]
    async fn test_fails_then_recovers() {
        let backend =
            FlakyBackend::new(Arc::new(NaiveBayesBackend::new()), FlakyPhase::Train, 2);
        let request = request();
        let data = backend.preprocess(&request).await.unwrap();

        assert!(backend.train(&request, &data).await.unwrap_err().is_transient());
        assert!(backend.train(&request, &data).await.unwrap_err().is_transient());
        assert!(backend.train(&request, &data).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_phases_unaffected() {
        let backend =
            FlakyBackend::new(Arc::new(NaiveBayesBackend::new()), FlakyPhase::Evaluate, 1);
        let request = request();
        assert!(backend.preprocess(&request).await.is_ok());
    }
}

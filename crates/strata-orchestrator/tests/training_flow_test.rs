//! End-to-end tests over the platform service: training lifecycle,
//! retry behavior, cancellation, and deployment.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strata_dataset::{DatasetId, RawTable};
use strata_orchestrator::{
    JobSnapshot, OrchestratorError, PlatformService, RetryPolicy, StartTrainingRequest,
};
use strata_training::{
    BackendResult, FlakyBackend, FlakyPhase, JobMetrics, JobStatus, ModelArtifact,
    NaiveBayesBackend, PredictionInput, PredictionOutcome, PreparedData, TrainingBackend,
    TrainingJobId, TrainingRequest,
};

/// Delegating backend that sleeps before preprocessing, to keep jobs
/// observable mid-flight.
struct SlowBackend {
    inner: NaiveBayesBackend,
    delay: Duration,
}

#[async_trait]
impl TrainingBackend for SlowBackend {
    fn id(&self) -> &'static str {
        "slow"
    }

    async fn preprocess(&self, request: &TrainingRequest) -> BackendResult<PreparedData> {
        tokio::time::sleep(self.delay).await;
        self.inner.preprocess(request).await
    }

    async fn train(
        &self,
        request: &TrainingRequest,
        data: &PreparedData,
    ) -> BackendResult<ModelArtifact> {
        self.inner.train(request, data).await
    }

    async fn evaluate(
        &self,
        request: &TrainingRequest,
        artifact: &ModelArtifact,
    ) -> BackendResult<JobMetrics> {
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

fn sample_table() -> RawTable {
    RawTable::new(
        vec!["text".to_string(), "label".to_string()],
        (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    vec![json!("cheap pills win money fast"), json!("spam")]
                } else {
                    vec![json!("agenda for the planning meeting"), json!("ham")]
                }
            })
            .collect(),
    )
}

async fn register(service: &PlatformService) -> DatasetId {
    service.register_dataset("messages", sample_table()).await.unwrap().id
}

fn start_request(dataset_id: DatasetId) -> StartTrainingRequest {
    StartTrainingRequest {
        project_id: "project-1".to_string(),
        dataset_id,
        target_column: "label".to_string(),
        feature_columns: vec!["text".to_string()],
        algorithm: None,
        test_size: Some(0.2),
        random_state: Some(7),
        preprocessing: None,
    }
}

/// Polls until terminal, returning every observed snapshot.
async fn poll_until_terminal(
    service: &PlatformService,
    job_id: &TrainingJobId,
) -> Vec<JobSnapshot> {
    let mut snapshots = Vec::new();
    for _ in 0..1000 {
        let snapshot = service.training_status(job_id).await.unwrap();
        let terminal = snapshot.status.is_terminal();
        snapshots.push(snapshot);
        if terminal {
            return snapshots;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job never reached a terminal state");
}

#[tokio::test]
async fn test_full_training_lifecycle() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    let dataset_id = register(&service).await;

    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    let snapshots = poll_until_terminal(&service, &response.job_id).await;
    let last = snapshots.last().unwrap();

    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.progress, 100);
    assert!(last.error_message.is_none());
    let metrics = last.metrics.as_ref().expect("completed job exposes metrics");
    assert!(metrics.accuracy > 0.0 && metrics.accuracy <= 1.0);

    // Progress is non-decreasing over the whole observation and only the
    // terminal completed snapshot carries 100.
    for pair in snapshots.windows(2) {
        assert!(pair[0].progress <= pair[1].progress);
    }
    for snapshot in &snapshots {
        if snapshot.progress == 100 {
            assert_eq!(snapshot.status, JobStatus::Completed);
        }
    }

    let started = last.started_at.expect("started_at set");
    let completed = last.completed_at.expect("completed_at set");
    assert!(started <= completed);

    let results = service.training_results(&response.job_id).await.unwrap();
    assert_eq!(results.class_names, vec!["ham".to_string(), "spam".to_string()]);
    assert_eq!(results.confusion_matrix.len(), 2);
    assert!(results.training_time_secs.is_some());
}

#[tokio::test]
async fn test_deploy_and_predict_round() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    let dataset_id = register(&service).await;
    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    poll_until_terminal(&service, &response.job_id).await;

    let record = service.deploy_model(&response.job_id, "alice", "spam-filter").await.unwrap();
    assert!(record.api_endpoint.contains(&record.model_id.to_string()));

    let input = PredictionInput::new().with_field("text", "win cheap money now");
    let prediction = service.predict(&record.model_id, &input).await.unwrap();
    assert_eq!(prediction.prediction, "spam");
    assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);
    assert!(prediction.processing_time_ms >= 0.0);

    // Undeploy is idempotent; prediction afterwards is rejected.
    service.undeploy_model(&record.model_id).await.unwrap();
    service.undeploy_model(&record.model_id).await.unwrap();
    assert!(matches!(
        service.predict(&record.model_id, &input).await,
        Err(OrchestratorError::ModelNotDeployed(_))
    ));
}

#[tokio::test]
async fn test_transient_failure_retried_to_success() {
    let backend = FlakyBackend::new(Arc::new(NaiveBayesBackend::new()), FlakyPhase::Train, 1);
    let service = PlatformService::with_retry_policy(
        Arc::new(backend),
        RetryPolicy { max_retries: 2, backoff: Duration::from_millis(100) },
    );
    let dataset_id = register(&service).await;

    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    let snapshots = poll_until_terminal(&service, &response.job_id).await;

    assert_eq!(snapshots.last().unwrap().status, JobStatus::Completed);
    // The retry is visible in the observed step history, not as failure.
    assert!(snapshots
        .iter()
        .any(|s| s.current_step.contains("retrying (attempt 2 of 3)")));
    assert!(snapshots.iter().all(|s| s.status != JobStatus::Failed));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_fails_job() {
    let backend = FlakyBackend::new(Arc::new(NaiveBayesBackend::new()), FlakyPhase::Train, 10);
    let service = PlatformService::with_retry_policy(
        Arc::new(backend),
        RetryPolicy { max_retries: 2, backoff: Duration::from_millis(10) },
    );
    let dataset_id = register(&service).await;

    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    let snapshots = poll_until_terminal(&service, &response.job_id).await;
    let last = snapshots.last().unwrap();

    assert_eq!(last.status, JobStatus::Failed);
    assert!(last.progress < 100);
    assert!(last.metrics.is_none(), "failed jobs never expose metrics");
    assert!(last
        .error_message
        .as_deref()
        .unwrap()
        .contains("injected transient failure"));
    assert!(last.current_step.contains("retry budget exhausted after 3 attempts"));
}

#[tokio::test]
async fn test_cancellation_is_cooperative() {
    let backend = SlowBackend { inner: NaiveBayesBackend::new(), delay: Duration::from_millis(300) };
    let service = PlatformService::new(Arc::new(backend));
    let dataset_id = register(&service).await;

    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.cancel_training(&response.job_id).await.unwrap();

    let snapshots = poll_until_terminal(&service, &response.job_id).await;
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, JobStatus::Failed);
    assert_eq!(last.error_message.as_deref(), Some("cancelled by user"));
    assert!(last.metrics.is_none());
}

#[tokio::test]
async fn test_deploy_rejected_while_running() {
    let backend = SlowBackend { inner: NaiveBayesBackend::new(), delay: Duration::from_millis(300) };
    let service = PlatformService::new(Arc::new(backend));
    let dataset_id = register(&service).await;

    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    let err = service.deploy_model(&response.job_id, "alice", "too-early").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::JobNotCompleted { .. }));

    let err = service.training_results(&response.job_id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::JobNotCompleted { .. }));

    // No deployment came into existence from the rejected call.
    poll_until_terminal(&service, &response.job_id).await;
    let record = service.deploy_model(&response.job_id, "alice", "too-early").await.unwrap();
    assert_eq!(record.prediction_count, 0);
}

#[tokio::test]
async fn test_duplicate_names_scoped_to_owner_and_liveness() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    let dataset_id = register(&service).await;
    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    poll_until_terminal(&service, &response.job_id).await;

    let first = service.deploy_model(&response.job_id, "alice", "clf").await.unwrap();
    assert!(matches!(
        service.deploy_model(&response.job_id, "alice", "clf").await,
        Err(OrchestratorError::DuplicateModelName { .. })
    ));

    // Same name under another owner is fine.
    service.deploy_model(&response.job_id, "bob", "clf").await.unwrap();

    // After undeploy the name is free again for the original owner.
    service.undeploy_model(&first.model_id).await.unwrap();
    service.deploy_model(&response.job_id, "alice", "clf").await.unwrap();
}

#[tokio::test]
async fn test_status_idempotence_and_revision_fast_path() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    let dataset_id = register(&service).await;
    let response = service.start_training(start_request(dataset_id)).await.unwrap();
    poll_until_terminal(&service, &response.job_id).await;

    let first = service.training_status(&response.job_id).await.unwrap();
    let second = service.training_status(&response.job_id).await.unwrap();
    assert_eq!(first, second);

    let unchanged = service
        .training_status_if_changed(&response.job_id, first.revision)
        .await
        .unwrap();
    assert!(unchanged.is_none());
    let stale = service
        .training_status_if_changed(&response.job_id, first.revision - 1)
        .await
        .unwrap();
    assert!(stale.is_some());
}

#[tokio::test]
async fn test_invalid_configuration_rejected_synchronously() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    let dataset_id = register(&service).await;

    let mut request = start_request(dataset_id);
    request.target_column = "no_such_column".to_string();
    let err = service.start_training(request).await.unwrap_err();
    match err {
        OrchestratorError::InvalidConfiguration { validation, .. } => {
            assert!(!validation.is_valid);
            assert!(validation
                .errors()
                .any(|i| i.message.contains("no_such_column")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_status_for_unknown_job() {
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));
    assert!(matches!(
        service.training_status(&TrainingJobId::new()).await,
        Err(OrchestratorError::JobNotFound(_))
    ));
}

//! Strata Training
//!
//! Training-side domain for the platform core:
//! - `TrainingConfiguration` with closed enums for every setting
//! - The configuration validator (`validate`) producing `ConfigValidation`
//! - The `TrainingJob` record and its status machine
//! - The `TrainingBackend` trait the orchestrator drives
//! - A reference naive-bayes backend and a flaky test double

pub mod backend;
pub mod config;
pub mod error;
pub mod job;
pub mod mock;
pub mod naive_bayes;
pub mod validation;

pub use backend::{
    ModelArtifact, PredictionInput, PredictionOutcome, PreparedData, TrainingBackend,
    TrainingRequest,
};
pub use config::{
    Algorithm, MissingValueStrategy, ModelSettings, NumericProcessing, PreprocessingConfig,
    TextProcessing, TrainingConfiguration,
};
pub use error::{BackendError, BackendResult};
pub use job::{JobMetrics, JobStatus, TrainingJob, TrainingJobId};
pub use mock::{FlakyBackend, FlakyPhase};
pub use naive_bayes::NaiveBayesBackend;
pub use validation::{validate, ConfigValidation, IssueKind, ValidationIssue};

//! Strata Orchestrator
//!
//! Runtime side of the training engine:
//! - `JobStore`: the shared job records under single-writer discipline
//! - `JobOrchestrator`: one background execution per job through the
//!   queued → preprocessing → training → evaluating lifecycle, with
//!   bounded retry and cooperative cancellation
//! - `ProgressReporter`: consistent status snapshots for pollers
//! - `DeploymentManager`: exposing completed jobs as prediction endpoints
//! - `PlatformService`: the typed facade consumed by UI and scripts

pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod reporter;
pub mod service;
pub mod store;

pub use deploy::{DeploymentManager, DeploymentRecord, DeploymentStatus, ModelId, PredictionResponse};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{JobOrchestrator, RetryPolicy};
pub use reporter::{JobSnapshot, ProgressReporter};
pub use service::{PlatformService, StartTrainingRequest, StartTrainingResponse, TrainingResults};
pub use store::JobStore;

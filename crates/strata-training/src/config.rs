//! User-facing training configuration.
//!
//! Every setting is a closed enum or a bounded scalar, enforced at the
//! validation boundary. A configuration stays mutable while the user
//! iterates in the UI; the orchestrator snapshots it into the job record
//! at acceptance, after which it is immutable.

use serde::{Deserialize, Serialize};

/// Classification algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Auto,
    Logistic,
    Svm,
    RandomForest,
    NaiveBayes,
}

/// Strategy for rows with missing feature values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    Drop,
    FillMean,
    FillMode,
    FillCustom,
}

/// Text-column preprocessing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProcessing {
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub strip_numbers: bool,
}

impl Default for TextProcessing {
    fn default() -> Self {
        Self { lowercase: true, strip_punctuation: true, strip_numbers: false }
    }
}

/// Numeric-column preprocessing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NumericProcessing {
    pub standardize: bool,
    pub clip_outliers: bool,
}

/// Missing-value and per-type preprocessing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub missing_values: MissingValueStrategy,
    /// Required iff `missing_values` is `FillCustom`.
    pub custom_fill_value: Option<String>,
    #[serde(default)]
    pub text: TextProcessing,
    #[serde(default)]
    pub numeric: NumericProcessing,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            missing_values: MissingValueStrategy::Drop,
            custom_fill_value: None,
            text: TextProcessing::default(),
            numeric: NumericProcessing::default(),
        }
    }
}

/// Model/split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub algorithm: Algorithm,
    /// Holdout share, exclusive (0, 1); recommended [0.1, 0.5].
    pub test_size: f64,
    /// Cross-validation folds, at least 2.
    pub cross_validation: u32,
    pub random_state: u64,
    pub hyperparameter_tuning: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Auto,
            test_size: 0.2,
            cross_validation: 5,
            random_state: 42,
            hyperparameter_tuning: false,
        }
    }
}

/// The user-chosen target/feature/preprocessing/model settings for one
/// training attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfiguration {
    pub target_column: Option<String>,
    /// Treated as a set: order irrelevant, duplicates invalid.
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub model: ModelSettings,
}

impl Default for TrainingConfiguration {
    fn default() -> Self {
        Self {
            target_column: None,
            feature_columns: Vec::new(),
            excluded_columns: Vec::new(),
            preprocessing: PreprocessingConfig::default(),
            model: ModelSettings::default(),
        }
    }
}

impl TrainingConfiguration {
    /// Convenience constructor for the common target + features case.
    #[must_use]
    pub fn new(target: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            target_column: Some(target.into()),
            feature_columns: features,
            ..Self::default()
        }
    }
}

//! Reference training backend: multinomial naive bayes over bag-of-words
//! features.
//!
//! This is the in-process stand-in for the platform's training fleet. It
//! honors the preprocessing settings and the seeded holdout split; every
//! configured algorithm is fitted as naive bayes, and
//! `hyperparameter_tuning` is accepted but has no effect here.

use crate::backend::{
    ModelArtifact, PredictionInput, PredictionOutcome, PreparedData, TrainingBackend,
    TrainingRequest,
};
use crate::config::{MissingValueStrategy, TextProcessing};
use crate::error::{BackendError, BackendResult};
use crate::job::JobMetrics;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Laplace smoothing constant.
const ALPHA: f64 = 1.0;

#[derive(Debug, Default)]
pub struct NaiveBayesBackend;

impl NaiveBayesBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Example {
    tokens: Vec<String>,
    label: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Corpus {
    examples: Vec<Example>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassModel {
    label: String,
    doc_count: u64,
    total_tokens: u64,
    token_counts: HashMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelPayload {
    features: Vec<String>,
    text: TextProcessing,
    classes: Vec<ClassModel>,
    vocab_size: usize,
    trained_docs: u64,
    holdout: Vec<Example>,
}

#[async_trait]
impl TrainingBackend for NaiveBayesBackend {
    fn id(&self) -> &'static str {
        "naive-bayes"
    }

    async fn preprocess(&self, request: &TrainingRequest) -> BackendResult<PreparedData> {
        let config = &request.configuration;
        let table = &request.dataset.table;

        let target = config
            .target_column
            .as_deref()
            .ok_or_else(|| BackendError::Fatal("target column not configured".to_string()))?;
        let target_index = table
            .column_index(target)
            .ok_or_else(|| BackendError::Fatal(format!("target column '{target}' not in dataset")))?;

        let mut feature_indexes = Vec::with_capacity(config.feature_columns.len());
        for name in &config.feature_columns {
            let index = table.column_index(name).ok_or_else(|| {
                BackendError::Fatal(format!("feature column '{name}' not in dataset"))
            })?;
            feature_indexes.push((name.as_str(), index));
        }

        let fills = FillValues::compute(request, &feature_indexes);
        let strategy = config.preprocessing.missing_values;
        let text_flags = config.preprocessing.text;

        let mut examples = Vec::new();
        let mut dropped = 0usize;

        'rows: for row in &table.rows {
            let label_cell = row.get(target_index).unwrap_or(&Value::Null);
            if label_cell.is_null() {
                // Rows without a label are unusable under any strategy.
                dropped += 1;
                continue;
            }

            let mut parts = Vec::with_capacity(feature_indexes.len());
            for (name, index) in &feature_indexes {
                let cell = row.get(*index).unwrap_or(&Value::Null);
                if cell.is_null() {
                    match strategy {
                        MissingValueStrategy::Drop => {
                            dropped += 1;
                            continue 'rows;
                        }
                        MissingValueStrategy::FillMean => {
                            parts.push(fills.mean_text(name));
                        }
                        MissingValueStrategy::FillMode => {
                            parts.push(fills.mode_text(name));
                        }
                        MissingValueStrategy::FillCustom => {
                            parts.push(
                                config.preprocessing.custom_fill_value.clone().unwrap_or_default(),
                            );
                        }
                    }
                } else {
                    parts.push(cell_text(cell));
                }
            }

            let tokens = tokenize(&parts.join(" "), text_flags);
            if tokens.is_empty() {
                dropped += 1;
                continue;
            }
            examples.push(Example { tokens, label: cell_text(label_cell) });
        }

        if examples.is_empty() {
            return Err(BackendError::Fatal("no usable rows after preprocessing".to_string()));
        }
        let classes: HashSet<&str> = examples.iter().map(|e| e.label.as_str()).collect();
        if classes.len() < 2 {
            return Err(BackendError::Fatal(
                "need at least two classes in the usable rows".to_string(),
            ));
        }

        debug!(
            job_id = %request.job_id,
            rows_used = examples.len(),
            rows_dropped = dropped,
            "Preprocessing finished"
        );
        Ok(PreparedData {
            rows_used: examples.len(),
            rows_dropped: dropped,
            payload: serde_json::to_value(Corpus { examples })?,
        })
    }

    async fn train(
        &self,
        request: &TrainingRequest,
        data: &PreparedData,
    ) -> BackendResult<ModelArtifact> {
        let corpus: Corpus = serde_json::from_value(data.payload.clone())?;
        let settings = &request.configuration.model;

        let mut class_names: Vec<String> = corpus
            .examples
            .iter()
            .map(|e| e.label.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        class_names.sort();

        // Seeded shuffle keeps the split reproducible for a fixed
        // random_state.
        let mut indexes: Vec<usize> = (0..corpus.examples.len()).collect();
        let mut rng = StdRng::seed_from_u64(settings.random_state);
        indexes.shuffle(&mut rng);

        let n = indexes.len();
        let holdout_len = ((n as f64 * settings.test_size).round() as usize).clamp(1, n - 1);
        let (holdout_idx, train_idx) = indexes.split_at(holdout_len);

        let mut models: HashMap<&str, ClassModel> = HashMap::new();
        let mut vocab: HashSet<&str> = HashSet::new();
        for &i in train_idx {
            let example = &corpus.examples[i];
            let model = models.entry(example.label.as_str()).or_insert_with(|| ClassModel {
                label: example.label.clone(),
                doc_count: 0,
                total_tokens: 0,
                token_counts: HashMap::new(),
            });
            model.doc_count += 1;
            for token in &example.tokens {
                vocab.insert(token);
                model.total_tokens += 1;
                *model.token_counts.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let mut classes: Vec<ClassModel> = models.into_values().collect();
        classes.sort_by(|a, b| a.label.cmp(&b.label));
        let trained_docs = train_idx.len() as u64;
        let holdout: Vec<Example> =
            holdout_idx.iter().map(|&i| corpus.examples[i].clone()).collect();

        debug!(
            job_id = %request.job_id,
            classes = classes.len(),
            vocab = vocab.len(),
            holdout = holdout.len(),
            "Model fitted"
        );
        let payload = ModelPayload {
            features: request.configuration.feature_columns.clone(),
            text: request.configuration.preprocessing.text,
            classes,
            vocab_size: vocab.len(),
            trained_docs,
            holdout,
        };
        Ok(ModelArtifact {
            backend_id: self.id().to_string(),
            class_names,
            payload: serde_json::to_value(payload)?,
        })
    }

    async fn evaluate(
        &self,
        request: &TrainingRequest,
        artifact: &ModelArtifact,
    ) -> BackendResult<JobMetrics> {
        let model: ModelPayload = serde_json::from_value(artifact.payload.clone())?;
        if model.holdout.is_empty() {
            return Err(BackendError::Fatal("holdout split is empty".to_string()));
        }
        if model.classes.is_empty() {
            return Err(BackendError::Fatal("model has no fitted classes".to_string()));
        }

        let index_of: HashMap<&str, usize> = artifact
            .class_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let k = artifact.class_names.len();
        let mut matrix = vec![vec![0u64; k]; k];

        for example in &model.holdout {
            let (predicted, _) = score(&model, &example.tokens);
            let (Some(&actual), Some(&guessed)) =
                (index_of.get(example.label.as_str()), index_of.get(predicted.as_str()))
            else {
                continue;
            };
            matrix[actual][guessed] += 1;
        }

        let metrics = metrics_from_matrix(&matrix, &artifact.class_names);
        debug!(
            job_id = %request.job_id,
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            "Evaluation finished"
        );
        Ok(metrics)
    }

    async fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &PredictionInput,
    ) -> BackendResult<PredictionOutcome> {
        let model: ModelPayload = serde_json::from_value(artifact.payload.clone())?;
        if model.classes.is_empty() {
            return Err(BackendError::Fatal("model has no fitted classes".to_string()));
        }

        let combined: String = model
            .features
            .iter()
            .filter_map(|name| input.fields.get(name))
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(" ");
        let tokens = tokenize(&combined, model.text);

        let (label, confidence) = score(&model, &tokens);
        Ok(PredictionOutcome { label, confidence })
    }
}

/// Per-feature fill values for the mean/mode strategies.
struct FillValues {
    means: HashMap<String, String>,
    modes: HashMap<String, String>,
}

impl FillValues {
    fn compute(request: &TrainingRequest, features: &[(&str, usize)]) -> Self {
        let mut means = HashMap::new();
        let mut modes = HashMap::new();
        for (name, index) in features {
            if let Some(stats) = request
                .dataset
                .profiles
                .iter()
                .find(|p| p.name == *name)
                .and_then(|p| p.statistics.as_ref())
            {
                means.insert((*name).to_string(), stats.mean.to_string());
            }

            let mut counts: HashMap<String, usize> = HashMap::new();
            for cell in request.dataset.table.column_values(*index) {
                if !cell.is_null() {
                    *counts.entry(cell_text(cell)).or_insert(0) += 1;
                }
            }
            if let Some(mode) = counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(value, _)| value)
            {
                modes.insert((*name).to_string(), mode);
            }
        }
        Self { means, modes }
    }

    fn mean_text(&self, name: &str) -> String {
        self.means.get(name).cloned().unwrap_or_default()
    }

    fn mode_text(&self, name: &str) -> String {
        self.modes.get(name).cloned().unwrap_or_default()
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn tokenize(text: &str, flags: TextProcessing) -> Vec<String> {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        let ch = if flags.lowercase { ch.to_ascii_lowercase() } else { ch };
        if (flags.strip_punctuation && !ch.is_alphanumeric() && !ch.is_whitespace())
            || (flags.strip_numbers && ch.is_ascii_digit())
        {
            cleaned.push(' ');
        } else {
            cleaned.push(ch);
        }
    }
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Scores tokens against every class; returns the winning label and its
/// normalized probability.
fn score(model: &ModelPayload, tokens: &[String]) -> (String, f64) {
    let total_docs = model.trained_docs.max(1) as f64;
    let vocab = model.vocab_size as f64;

    let log_probs: Vec<f64> = model
        .classes
        .iter()
        .map(|class| {
            let mut log_prob = ((class.doc_count as f64 + ALPHA) / (total_docs + ALPHA)).ln();
            let denominator = class.total_tokens as f64 + ALPHA * (vocab + 1.0);
            for token in tokens {
                let count = class.token_counts.get(token).copied().unwrap_or(0) as f64;
                log_prob += ((count + ALPHA) / denominator).ln();
            }
            log_prob
        })
        .collect();

    let best = log_probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).expect("finite log probabilities"))
        .map_or(0, |(i, _)| i);

    // Softmax with the max subtracted for numeric stability.
    let max = log_probs[best];
    let denom: f64 = log_probs.iter().map(|lp| (lp - max).exp()).sum();
    let confidence = 1.0 / denom;

    (model.classes[best].label.clone(), confidence)
}

fn metrics_from_matrix(matrix: &[Vec<u64>], class_names: &[String]) -> JobMetrics {
    let k = class_names.len();
    let total: u64 = matrix.iter().flatten().sum();
    let correct: u64 = (0..k).map(|i| matrix[i][i]).sum();
    let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1 = 0.0;
    for i in 0..k {
        let support: u64 = matrix[i].iter().sum();
        if support == 0 {
            continue;
        }
        let weight = support as f64 / total as f64;
        let predicted: u64 = (0..k).map(|j| matrix[j][i]).sum();
        let p = if predicted > 0 { matrix[i][i] as f64 / predicted as f64 } else { 0.0 };
        let r = matrix[i][i] as f64 / support as f64;
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    JobMetrics {
        accuracy,
        precision,
        recall,
        f1_score: f1,
        confusion_matrix: matrix.to_vec(),
        class_names: class_names.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfiguration;
    use crate::job::TrainingJobId;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use strata_dataset::{profile_table, DatasetId, RawTable, StoredDataset};

    fn spam_request(strategy: MissingValueStrategy) -> TrainingRequest {
        let rows: Vec<Vec<Value>> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    vec![json!("buy cheap pills now win money"), json!("spam")]
                } else {
                    vec![json!("meeting notes for the quarterly review"), json!("ham")]
                }
            })
            .collect();
        request_for(rows, strategy)
    }

    fn request_for(rows: Vec<Vec<Value>>, strategy: MissingValueStrategy) -> TrainingRequest {
        let table =
            RawTable::new(vec!["text".to_string(), "label".to_string()], rows);
        let profiles = profile_table(&table).unwrap();
        let mut configuration =
            TrainingConfiguration::new("label", vec!["text".to_string()]);
        configuration.preprocessing.missing_values = strategy;
        if strategy == MissingValueStrategy::FillCustom {
            configuration.preprocessing.custom_fill_value = Some("missing".to_string());
        }
        TrainingRequest {
            job_id: TrainingJobId::new(),
            configuration,
            dataset: Arc::new(StoredDataset {
                id: DatasetId::new(),
                name: "spam".to_string(),
                table,
                profiles,
                registered_at: Utc::now(),
            }),
        }
    }

    #[tokio::test]
    async fn test_full_train_and_evaluate() {
        let backend = NaiveBayesBackend::new();
        let request = spam_request(MissingValueStrategy::Drop);

        let data = backend.preprocess(&request).await.unwrap();
        assert_eq!(data.rows_used, 20);
        assert_eq!(data.rows_dropped, 0);

        let artifact = backend.train(&request, &data).await.unwrap();
        assert_eq!(artifact.class_names, vec!["ham".to_string(), "spam".to_string()]);

        let metrics = backend.evaluate(&request, &artifact).await.unwrap();
        // Two perfectly separable classes; the holdout must score clean.
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.confusion_matrix.len(), 2);
        let holdout_total: u64 = metrics.confusion_matrix.iter().flatten().sum();
        assert_eq!(holdout_total, 4); // 20 rows * 0.2 test_size
    }

    #[tokio::test]
    async fn test_predict_separable_input() {
        let backend = NaiveBayesBackend::new();
        let request = spam_request(MissingValueStrategy::Drop);
        let data = backend.preprocess(&request).await.unwrap();
        let artifact = backend.train(&request, &data).await.unwrap();

        let spam = backend
            .predict(&artifact, &PredictionInput::new().with_field("text", "win cheap money"))
            .await
            .unwrap();
        assert_eq!(spam.label, "spam");
        assert!(spam.confidence > 0.5 && spam.confidence <= 1.0);

        let ham = backend
            .predict(
                &artifact,
                &PredictionInput::new().with_field("text", "quarterly meeting notes"),
            )
            .await
            .unwrap();
        assert_eq!(ham.label, "ham");
    }

    #[tokio::test]
    async fn test_drop_strategy_drops_null_feature_rows() {
        let mut rows: Vec<Vec<Value>> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    vec![json!("alpha beta"), json!("a")]
                } else {
                    vec![json!("gamma delta"), json!("b")]
                }
            })
            .collect();
        rows.push(vec![Value::Null, json!("a")]);

        let backend = NaiveBayesBackend::new();
        let dropped = backend
            .preprocess(&request_for(rows.clone(), MissingValueStrategy::Drop))
            .await
            .unwrap();
        assert_eq!(dropped.rows_used, 10);
        assert_eq!(dropped.rows_dropped, 1);

        let filled = backend
            .preprocess(&request_for(rows, MissingValueStrategy::FillCustom))
            .await
            .unwrap();
        assert_eq!(filled.rows_used, 11);
        assert_eq!(filled.rows_dropped, 0);
    }

    #[tokio::test]
    async fn test_single_class_corpus_rejected() {
        let rows = (0..6).map(|_| vec![json!("same text"), json!("only")]).collect();
        let backend = NaiveBayesBackend::new();
        let err = backend
            .preprocess(&request_for(rows, MissingValueStrategy::Drop))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_seeded_split_is_deterministic() {
        let backend = NaiveBayesBackend::new();
        let request = spam_request(MissingValueStrategy::Drop);
        let data = backend.preprocess(&request).await.unwrap();

        let first = backend.train(&request, &data).await.unwrap();
        let second = backend.train(&request, &data).await.unwrap();
        let m1 = backend.evaluate(&request, &first).await.unwrap();
        let m2 = backend.evaluate(&request, &second).await.unwrap();
        assert_eq!(m1.accuracy, m2.accuracy);
        assert_eq!(m1.confusion_matrix, m2.confusion_matrix);
    }
}

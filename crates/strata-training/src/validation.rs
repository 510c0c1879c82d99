//! Configuration validation against column profiles.
//!
//! `validate` is synchronous, idempotent, and side-effect free; the UI
//! re-invokes it on every configuration edit. Rules run in a fixed order
//! and never short-circuit: the verdict carries every issue found.

use crate::config::{MissingValueStrategy, TrainingConfiguration};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strata_dataset::{ColumnProfile, ColumnType};

/// Issue class; only `Error` entries block acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Error,
    Warning,
    Info,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub column: Option<String>,
    pub message: String,
    /// 1 (informational) .. 3 (blocking).
    pub severity: u8,
}

/// Validation verdict; `is_valid` holds iff the issue list contains zero
/// `Error`-kind entries, independent of warnings and infos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ConfigValidation {
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let is_valid = !issues.iter().any(|i| i.kind == IssueKind::Error);
        Self { is_valid, issues }
    }

    /// Errors only, in reporting order.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.kind == IssueKind::Error)
    }
}

struct IssueList(Vec<ValidationIssue>);

impl IssueList {
    fn error(&mut self, column: Option<&str>, message: impl Into<String>) {
        self.push(IssueKind::Error, column, message, 3);
    }

    fn warning(&mut self, column: Option<&str>, message: impl Into<String>, severity: u8) {
        self.push(IssueKind::Warning, column, message, severity);
    }

    fn info(&mut self, column: Option<&str>, message: impl Into<String>) {
        self.push(IssueKind::Info, column, message, 1);
    }

    fn push(&mut self, kind: IssueKind, column: Option<&str>, message: impl Into<String>, severity: u8) {
        self.0.push(ValidationIssue {
            kind,
            column: column.map(str::to_string),
            message: message.into(),
            severity,
        });
    }
}

/// Validates a candidate configuration against the dataset's profiles.
#[must_use]
pub fn validate(config: &TrainingConfiguration, profiles: &[ColumnProfile]) -> ConfigValidation {
    let mut issues = IssueList(Vec::new());
    let find = |name: &str| profiles.iter().find(|p| p.name == name);
    let target = config.target_column.as_deref();
    let target_profile = target.and_then(find);

    // Rule 1: a target must be selected.
    if target.is_none() {
        issues.error(None, "target column required");
    }

    if let (Some(name), Some(profile)) = (target, target_profile) {
        // Rule 2: classification needs at least two classes.
        if profile.unique_count < 2 {
            issues.error(Some(name), "target must have \u{2265}2 classes");
        }
        // Rule 3: nulls in the target shrink the usable training set.
        if profile.null_count > 0 {
            issues.warning(
                Some(name),
                format!("target column has {} null values", profile.null_count),
                2,
            );
        }
        // Rule 4: very wide targets rarely train well.
        if profile.unique_count > 50 {
            issues.warning(Some(name), "too many classes for classification", 2);
        }
    }

    // Rule 5: at least one feature.
    if config.feature_columns.is_empty() {
        issues.error(None, "at least one feature required");
    }

    // Rule 6: selected columns that are mostly null.
    let selected = target
        .into_iter()
        .chain(config.feature_columns.iter().map(String::as_str));
    for name in selected {
        if let Some(profile) = find(name) {
            if profile.null_percentage > 50.0 {
                issues.warning(
                    Some(name),
                    format!(
                        "column '{}' is {}% null; most rows will be imputed or dropped",
                        name, profile.null_percentage
                    ),
                    2,
                );
            }
        }
    }

    // Rule 7: one notice when text features are in play.
    if config
        .feature_columns
        .iter()
        .filter_map(|name| find(name))
        .any(|p| p.inferred_type == ColumnType::Text)
    {
        issues.info(None, "text features selected; text preprocessing will be applied");
    }

    // Rule 8: holdout share outside the recommended band.
    let test_size = config.model.test_size;
    if !(0.1..=0.5).contains(&test_size) {
        issues.warning(
            None,
            format!("test_size {test_size} is outside the recommended range [0.1, 0.5]"),
            1,
        );
    }

    structural_rules(config, profiles, &mut issues);
    ConfigValidation::from_issues(issues.0)
}

/// Shape rules: column references, set disjointness, preprocessing and
/// split bounds. All are client-correctable errors.
fn structural_rules(
    config: &TrainingConfiguration,
    profiles: &[ColumnProfile],
    issues: &mut IssueList,
) {
    let known: HashSet<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    let target = config.target_column.as_deref();

    if let Some(name) = target {
        if !known.contains(name) {
            issues.error(Some(name), format!("unknown column: '{name}'"));
        }
    }
    for name in &config.feature_columns {
        if !known.contains(name.as_str()) {
            issues.error(Some(name), format!("unknown column: '{name}'"));
        }
    }
    for name in &config.excluded_columns {
        if !known.contains(name.as_str()) {
            issues.error(Some(name), format!("unknown column: '{name}'"));
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for name in &config.feature_columns {
        if !seen.insert(name.as_str()) {
            issues.error(Some(name), format!("duplicate feature column '{name}'"));
        }
        if Some(name.as_str()) == target {
            issues.error(Some(name), "target column cannot also be a feature");
        }
    }

    for name in &config.excluded_columns {
        let selected = Some(name.as_str()) == target
            || config.feature_columns.iter().any(|f| f == name);
        if selected {
            issues.error(Some(name), format!("excluded column '{name}' is also selected"));
        }
    }

    let preprocessing = &config.preprocessing;
    match (preprocessing.missing_values, preprocessing.custom_fill_value.as_ref()) {
        (MissingValueStrategy::FillCustom, None) => {
            issues.error(None, "custom fill value required for fill_custom strategy");
        }
        (MissingValueStrategy::FillCustom, Some(_)) => {}
        (_, Some(_)) => {
            issues.info(None, "custom fill value is ignored unless strategy is fill_custom");
        }
        (_, None) => {}
    }

    if config.model.cross_validation < 2 {
        issues.error(None, "cross_validation must be at least 2");
    }
    let test_size = config.model.test_size;
    if !test_size.is_finite() || test_size <= 0.0 || test_size >= 1.0 {
        issues.error(None, "test_size must be strictly between 0 and 1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use strata_dataset::{profile_table, RawTable};

    /// Dataset from the platform acceptance checklist:
    /// id (8 unique / 8), text (8/8 with 2 nulls), category (2/8, no nulls).
    fn checklist_profiles() -> Vec<ColumnProfile> {
        let rows = (0..8)
            .map(|i| {
                vec![
                    json!(i + 1),
                    if i < 2 { Value::Null } else { json!(format!("row text {i}")) },
                    json!(if i % 2 == 0 { "spam" } else { "ham" }),
                ]
            })
            .collect();
        let table = RawTable::new(
            vec!["id".to_string(), "text".to_string(), "category".to_string()],
            rows,
        );
        profile_table(&table).unwrap()
    }

    fn errors(validation: &ConfigValidation) -> Vec<&ValidationIssue> {
        validation.errors().collect()
    }

    #[test]
    fn test_missing_target_is_single_error() {
        let profiles = checklist_profiles();
        let config = TrainingConfiguration {
            target_column: None,
            feature_columns: vec!["text".to_string()],
            ..TrainingConfiguration::default()
        };

        let validation = validate(&config, &profiles);
        assert!(!validation.is_valid);
        let errs = errors(&validation);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "target column required");
    }

    #[test]
    fn test_valid_config_with_text_feature_info_only() {
        let profiles = checklist_profiles();
        let config = TrainingConfiguration::new("category", vec!["text".to_string()]);

        let validation = validate(&config, &profiles);
        assert!(validation.is_valid);
        assert_eq!(validation.issues.len(), 1);
        assert_eq!(validation.issues[0].kind, IssueKind::Info);
        assert!(validation.issues[0].message.contains("text preprocessing"));
    }

    #[test]
    fn test_single_class_target_rejected() {
        let rows = (0..6)
            .map(|i| vec![json!("only"), json!(format!("t{i}"))])
            .collect();
        let table = RawTable::new(vec!["label".to_string(), "text".to_string()], rows);
        let profiles = profile_table(&table).unwrap();
        let config = TrainingConfiguration::new("label", vec!["text".to_string()]);

        let validation = validate(&config, &profiles);
        assert!(!validation.is_valid);
        assert!(errors(&validation)
            .iter()
            .any(|i| i.message.contains("\u{2265}2 classes")));
    }

    #[test]
    fn test_empty_features_rejected() {
        let profiles = checklist_profiles();
        let config = TrainingConfiguration::new("category", vec![]);

        let validation = validate(&config, &profiles);
        assert!(!validation.is_valid);
        assert!(errors(&validation)
            .iter()
            .any(|i| i.message == "at least one feature required"));
    }

    #[test]
    fn test_is_valid_iff_no_error_entries() {
        let profiles = checklist_profiles();

        // Warnings and infos only: test_size outside the recommended band.
        let mut config = TrainingConfiguration::new("category", vec!["text".to_string()]);
        config.model.test_size = 0.6;
        let validation = validate(&config, &profiles);
        assert!(validation.is_valid);
        assert!(validation.issues.iter().any(|i| i.kind == IssueKind::Warning));

        // One structural error flips the verdict.
        config.feature_columns.push("category".to_string());
        let validation = validate(&config, &profiles);
        assert!(!validation.is_valid);
        assert_eq!(
            validation.is_valid,
            validation.issues.iter().all(|i| i.kind != IssueKind::Error)
        );
    }

    #[test]
    fn test_unknown_and_overlapping_references() {
        let profiles = checklist_profiles();
        let config = TrainingConfiguration {
            target_column: Some("category".to_string()),
            feature_columns: vec!["text".to_string(), "ghost".to_string()],
            excluded_columns: vec!["text".to_string()],
            ..TrainingConfiguration::default()
        };

        let validation = validate(&config, &profiles);
        let messages: Vec<&str> =
            errors(&validation).iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"unknown column: 'ghost'"));
        assert!(messages.contains(&"excluded column 'text' is also selected"));
    }

    #[test]
    fn test_custom_fill_requires_value() {
        let profiles = checklist_profiles();
        let mut config = TrainingConfiguration::new("category", vec!["text".to_string()]);
        config.preprocessing.missing_values = MissingValueStrategy::FillCustom;

        let validation = validate(&config, &profiles);
        assert!(!validation.is_valid);

        config.preprocessing.custom_fill_value = Some("n/a".to_string());
        assert!(validate(&config, &profiles).is_valid);
    }

    #[test]
    fn test_target_null_warning_carries_count() {
        let profiles = checklist_profiles();
        // "text" has 2 nulls and 6 distinct values, so it can be targeted.
        let config = TrainingConfiguration::new("text", vec!["id".to_string()]);

        let validation = validate(&config, &profiles);
        assert!(validation
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::Warning && i.message.contains("2 null values")));
    }
}

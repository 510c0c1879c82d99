//! Per-column dataset profiling.
//!
//! Profiling is a pure function of the input table: type inference,
//! null/unique accounting, numeric summaries, and the target/feature
//! recommendation flags consumed by the configuration validator.

use crate::error::{DatasetError, DatasetResult};
use crate::table::RawTable;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Share of non-null values that must parse for a column to be typed
/// `Number` or `Date`.
const TYPE_INFERENCE_THRESHOLD: f64 = 0.95;

/// Upper bound on `sample_values`.
const MAX_SAMPLE_VALUES: usize = 10;

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    Boolean,
    Date,
    Mixed,
}

/// Coarse per-column quality grade surfaced to the configuration UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Good,
    Fair,
    Poor,
}

/// Numeric summary, present only for `Number` columns with at least one
/// non-null value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Statistical summary of one dataset column.
///
/// Computed once at registration time and immutable thereafter. The
/// recommendation flags are derived across the whole dataset and are not
/// independently settable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: ColumnType,
    pub null_count: usize,
    pub unique_count: usize,
    pub total_count: usize,
    pub null_percentage: f64,
    pub sample_values: Vec<Value>,
    pub statistics: Option<NumericSummary>,
    pub data_quality: DataQuality,
    pub is_recommended_target: bool,
    pub is_recommended_feature: bool,
}

impl ColumnProfile {
    /// Non-null cell count; `null_count + non_null_count == total_count`.
    #[must_use]
    pub fn non_null_count(&self) -> usize {
        self.total_count - self.null_count
    }
}

/// Profiles every column of a table.
///
/// # Errors
/// Returns `DatasetError::NoColumns` for a schema with zero columns and
/// `DatasetError::EmptyDataset` for a table with zero rows.
pub fn profile_table(table: &RawTable) -> DatasetResult<Vec<ColumnProfile>> {
    if table.column_count() == 0 {
        return Err(DatasetError::NoColumns);
    }
    if table.row_count() == 0 {
        return Err(DatasetError::EmptyDataset);
    }

    let (mut profiles, traits): (Vec<ColumnProfile>, Vec<ColumnTraits>) = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| profile_column(table, index, name))
        .unzip();

    apply_recommendations(&mut profiles, &traits);
    Ok(profiles)
}

/// Scan-time facts that feed recommendations but are not part of the
/// persisted profile.
#[derive(Debug, Default)]
struct ColumnTraits {
    monotonic_integers: bool,
}

fn profile_column(table: &RawTable, index: usize, name: &str) -> (ColumnProfile, ColumnTraits) {
    let total_count = table.row_count();
    let mut null_count = 0;
    let mut unique: HashSet<String> = HashSet::new();
    let mut sample_values: Vec<Value> = Vec::new();
    let mut sample_seen: HashSet<String> = HashSet::new();
    let mut counts = TypeCounts::default();
    let mut numeric_values: Vec<f64> = Vec::new();
    let mut monotonic = MonotonicIntegers::default();

    for cell in table.column_values(index) {
        if cell.is_null() {
            null_count += 1;
            continue;
        }

        let key = canonical_key(cell);
        unique.insert(key.clone());

        if sample_values.len() < MAX_SAMPLE_VALUES && sample_seen.insert(key) {
            sample_values.push(cell.clone());
        }

        counts.observe(cell);
        if let Some(n) = numeric_value(cell) {
            numeric_values.push(n);
            monotonic.observe(n);
        }
    }

    let inferred_type = counts.infer();
    let statistics = if inferred_type == ColumnType::Number && !numeric_values.is_empty() {
        Some(numeric_summary(&mut numeric_values))
    } else {
        None
    };

    let null_percentage = round2(null_count as f64 / total_count as f64 * 100.0);
    let unique_count = unique.len();
    let non_null_count = total_count - null_count;

    let profile = ColumnProfile {
        name: name.to_string(),
        inferred_type,
        null_count,
        unique_count,
        total_count,
        null_percentage,
        sample_values,
        statistics,
        data_quality: assess_quality(inferred_type, null_percentage, unique_count, total_count),
        is_recommended_target: false,
        is_recommended_feature: false,
    };
    let traits = ColumnTraits {
        monotonic_integers: monotonic.holds() && unique_count == non_null_count,
    };
    (profile, traits)
}

/// Tracks whether every numeric value seen so far is an integer and the
/// sequence is strictly monotonic in row order.
#[derive(Debug, Default)]
struct MonotonicIntegers {
    seen_any: bool,
    broken: bool,
    ascending: bool,
    descending: bool,
    prev: f64,
}

impl MonotonicIntegers {
    fn observe(&mut self, value: f64) {
        if self.broken {
            return;
        }
        if value.fract() != 0.0 {
            self.broken = true;
            return;
        }
        if self.seen_any {
            if value > self.prev {
                self.ascending = true;
            } else if value < self.prev {
                self.descending = true;
            } else {
                self.broken = true; // duplicates are never sequential keys
            }
            if self.ascending && self.descending {
                self.broken = true;
            }
        }
        self.seen_any = true;
        self.prev = value;
    }

    fn holds(&self) -> bool {
        self.seen_any && !self.broken
    }
}

/// Per-class observation counters used by type inference.
#[derive(Debug, Default)]
struct TypeCounts {
    non_null: usize,
    numeric: usize,
    date: usize,
    boolean: usize,
    text: usize,
}

impl TypeCounts {
    fn observe(&mut self, cell: &Value) {
        self.non_null += 1;
        match cell {
            Value::Number(_) => self.numeric += 1,
            Value::Bool(_) => self.boolean += 1,
            Value::String(s) => {
                if parses_as_number(s) {
                    self.numeric += 1;
                } else if parses_as_date(s) {
                    self.date += 1;
                } else if is_boolean_token(s) {
                    self.boolean += 1;
                } else {
                    self.text += 1;
                }
            }
            // Arrays/objects never appear in tabular uploads; treat as text.
            _ => self.text += 1,
        }
    }

    fn infer(&self) -> ColumnType {
        if self.non_null == 0 {
            return ColumnType::Text;
        }
        let share = |count: usize| count as f64 / self.non_null as f64;

        if share(self.numeric) >= TYPE_INFERENCE_THRESHOLD {
            return ColumnType::Number;
        }
        if share(self.date) >= TYPE_INFERENCE_THRESHOLD {
            return ColumnType::Date;
        }
        if self.boolean == self.non_null {
            return ColumnType::Boolean;
        }

        let observed = [self.numeric, self.date, self.boolean, self.text]
            .iter()
            .filter(|&&count| count > 0)
            .count();
        if observed > 1 { ColumnType::Mixed } else { ColumnType::Text }
    }
}

fn canonical_key(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric_value(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let parsed: f64 = s.trim().parse().ok()?;
            parsed.is_finite().then_some(parsed)
        }
        _ => None,
    }
}

fn parses_as_number(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

/// Recognized date grammar: ISO and day-first calendar dates plus
/// RFC 3339 timestamps.
fn parses_as_date(s: &str) -> bool {
    let s = s.trim();
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];
    FORMATS.iter().any(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
        || DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_boolean_token(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "y" | "n" | "t" | "f" | "1" | "0"
    )
}

fn numeric_summary(values: &mut Vec<f64>) -> NumericSummary {
    values.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
    let n = values.len();
    let min = values[0];
    let max = values[n - 1];
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        f64::midpoint(values[n / 2 - 1], values[n / 2])
    } else {
        values[n / 2]
    };
    let std_dev = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    NumericSummary { min, max, mean, median, std_dev }
}

fn assess_quality(
    inferred_type: ColumnType,
    null_percentage: f64,
    unique_count: usize,
    total_count: usize,
) -> DataQuality {
    if null_percentage > 50.0 {
        return DataQuality::Poor;
    }
    let unique_percentage = unique_count as f64 / total_count as f64 * 100.0;
    if null_percentage > 20.0 || (inferred_type == ColumnType::Text && unique_percentage < 5.0) {
        return DataQuality::Fair;
    }
    DataQuality::Good
}

/// Derives the target/feature recommendation flags across the dataset.
///
/// At most one column is flagged as recommended target: the categorical
/// column with the fewest classes in the 2..=20 band, ties broken by
/// column order.
fn apply_recommendations(profiles: &mut [ColumnProfile], traits: &[ColumnTraits]) {
    let target = profiles
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            matches!(p.inferred_type, ColumnType::Text | ColumnType::Boolean)
                && (2..=20).contains(&p.unique_count)
        })
        .min_by_key(|(index, p)| (p.unique_count, *index))
        .map(|(index, _)| index);

    for (index, profile) in profiles.iter_mut().enumerate() {
        let is_identifier = id_like_name(&profile.name) && traits[index].monotonic_integers;
        profile.is_recommended_target = Some(index) == target;
        profile.is_recommended_feature = match profile.inferred_type {
            ColumnType::Text => profile.unique_count > 10,
            ColumnType::Number => !is_identifier,
            _ => false,
        };
    }
}

fn id_like_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    matches!(lower.as_str(), "id" | "key" | "uuid" | "index")
        || lower.ends_with("_id")
        || lower.ends_with("id")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

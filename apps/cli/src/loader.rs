//! CSV ingestion into a `RawTable`.

use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use strata_dataset::RawTable;

/// Reads a headered CSV file. Empty cells become nulls; cells that parse
/// as finite numbers become JSON numbers so the profiler sees native
/// numeric values.
pub fn load_csv(path: &Path) -> anyhow::Result<RawTable> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let columns: Vec<String> =
        reader.headers().context("reading CSV header")?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("reading CSV record")?;
        rows.push(record.iter().map(cell_value).collect());
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded CSV dataset");
    Ok(RawTable::new(columns, rows))
}

fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            if let Some(n) = serde_json::Number::from_f64(number) {
                return Value::Number(n);
            }
        }
    }
    Value::String(raw.to_string())
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier for a registered dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl DatasetId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Column-ordered tabular data as received from the upload pipeline.
///
/// Cells are raw JSON values; `Null` marks a missing value. Rows shorter
/// than the schema read as trailing nulls, extra cells are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Resolves a column name to its positional index.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterates the cells of one column, padding short rows with `Null`.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        const NULL: &Value = &Value::Null;
        self.rows.iter().map(move |row| row.get(index).unwrap_or(NULL))
    }

    /// Returns one row as `(column name, cell)` pairs.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<(&str, &Value)>> {
        const NULL: &Value = &Value::Null;
        self.rows.get(index).map(|row| {
            self.columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_str(), row.get(i).unwrap_or(NULL)))
                .collect()
        })
    }
}

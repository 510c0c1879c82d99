//! In-memory dataset registry.
//!
//! Columns are profiled exactly once, at registration time; the stored
//! profiles are immutable until the dataset is re-registered.

use crate::error::{DatasetError, DatasetResult};
use crate::preview::{paginate, PreviewPage};
use crate::profile::{profile_table, ColumnProfile};
use crate::table::{DatasetId, RawTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A registered dataset together with its immutable column profiles.
#[derive(Debug)]
pub struct StoredDataset {
    pub id: DatasetId,
    pub name: String,
    pub table: RawTable,
    pub profiles: Vec<ColumnProfile>,
    pub registered_at: DateTime<Utc>,
}

/// Registration receipt returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub registered_at: DateTime<Utc>,
}

/// Thread-safe dataset registry shared between the service surface and
/// the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    datasets: Arc<RwLock<HashMap<DatasetId, Arc<StoredDataset>>>>,
}

impl DatasetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table and profiles its columns.
    ///
    /// # Errors
    /// Fails with the profiler's error when the table is empty or has no
    /// columns; nothing is stored in that case.
    pub async fn register(&self, name: &str, table: RawTable) -> DatasetResult<DatasetSummary> {
        let profiles = profile_table(&table)?;
        let dataset = StoredDataset {
            id: DatasetId::new(),
            name: name.to_string(),
            table,
            profiles,
            registered_at: Utc::now(),
        };
        let summary = DatasetSummary {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            row_count: dataset.table.row_count(),
            column_count: dataset.table.column_count(),
            registered_at: dataset.registered_at,
        };

        debug!(
            dataset_id = %summary.id,
            rows = summary.row_count,
            columns = summary.column_count,
            "Registered dataset"
        );
        let mut datasets = self.datasets.write().await;
        datasets.insert(summary.id.clone(), Arc::new(dataset));
        Ok(summary)
    }

    /// Fetches a dataset by id.
    pub async fn get(&self, id: &DatasetId) -> DatasetResult<Arc<StoredDataset>> {
        let datasets = self.datasets.read().await;
        datasets.get(id).cloned().ok_or_else(|| DatasetError::NotFound(id.clone()))
    }

    /// Returns the column profiles computed at registration time.
    pub async fn profiles(&self, id: &DatasetId) -> DatasetResult<Vec<ColumnProfile>> {
        Ok(self.get(id).await?.profiles.clone())
    }

    /// Serves one page of raw rows.
    pub async fn preview(
        &self,
        id: &DatasetId,
        rows_per_page: usize,
        page: usize,
    ) -> DatasetResult<PreviewPage> {
        Ok(paginate(&self.get(id).await?.table, rows_per_page, page))
    }

    /// Removes a dataset.
    ///
    /// # Errors
    /// Fails with `DatasetError::NotFound` if the id is unknown.
    pub async fn remove(&self, id: &DatasetId) -> DatasetResult<()> {
        let mut datasets = self.datasets.write().await;
        if datasets.remove(id).is_none() {
            return Err(DatasetError::NotFound(id.clone()));
        }
        debug!(dataset_id = %id, "Removed dataset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> RawTable {
        RawTable::new(
            vec!["text".to_string(), "category".to_string()],
            (0..8)
                .map(|i| vec![json!(format!("row {i}")), json!(format!("c{}", i % 2))])
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_register_and_fetch_profiles() {
        let store = DatasetStore::new();
        let summary = store.register("sample", sample_table()).await.unwrap();
        assert_eq!(summary.row_count, 8);
        assert_eq!(summary.column_count, 2);

        let profiles = store.profiles(&summary.id).await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(profiles[1].is_recommended_target);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_table() {
        let store = DatasetStore::new();
        let empty = RawTable::new(vec!["a".to_string()], vec![]);
        assert!(store.register("empty", empty).await.is_err());
    }

    #[tokio::test]
    async fn test_preview_pagination() {
        let store = DatasetStore::new();
        let summary = store.register("sample", sample_table()).await.unwrap();
        let page = store.preview(&summary.id, 3, 2).await.unwrap();
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_remove_is_not_idempotent() {
        let store = DatasetStore::new();
        let summary = store.register("sample", sample_table()).await.unwrap();
        store.remove(&summary.id).await.unwrap();
        assert!(matches!(
            store.remove(&summary.id).await,
            Err(DatasetError::NotFound(_))
        ));
    }
}

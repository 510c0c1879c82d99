use crate::table::DatasetId;
use thiserror::Error;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("dataset has no columns")]
    NoColumns,

    #[error("dataset not found: {0}")]
    NotFound(DatasetId),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

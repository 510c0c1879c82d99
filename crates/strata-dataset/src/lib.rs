//! Strata Dataset
//!
//! Dataset-side primitives for the training engine:
//! - Raw tabular data (`RawTable`)
//! - Per-column profiling with type inference and recommendation flags
//! - Paginated previews
//! - An in-memory dataset registry (`DatasetStore`)

pub mod error;
pub mod preview;
pub mod profile;
pub mod store;
pub mod table;

pub use error::{DatasetError, DatasetResult};
pub use preview::{paginate, PreviewPage};
pub use profile::{profile_table, ColumnProfile, ColumnType, DataQuality, NumericSummary};
pub use store::{DatasetStore, DatasetSummary, StoredDataset};
pub use table::{DatasetId, RawTable};

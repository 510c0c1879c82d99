//! Paginated dataset previews.

use crate::table::RawTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of raw rows, as served to the configuration UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewPage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
    pub page: usize,
    pub rows_per_page: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Extracts one page of rows from a table.
///
/// Pages are 1-based; `page` and `rows_per_page` are clamped to at least 1.
/// A page past the end yields an empty row set rather than an error.
#[must_use]
pub fn paginate(table: &RawTable, rows_per_page: usize, page: usize) -> PreviewPage {
    let rows_per_page = rows_per_page.max(1);
    let page = page.max(1);
    let total_rows = table.row_count();
    let start = (page - 1) * rows_per_page;
    let end = (start + rows_per_page).min(total_rows);

    let rows = if start < total_rows {
        table.rows[start..end]
            .iter()
            .map(|row| {
                // Pad short rows so every preview row matches the schema width.
                (0..table.column_count())
                    .map(|i| row.get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    } else {
        Vec::new()
    };

    PreviewPage {
        columns: table.columns.clone(),
        rows,
        total_rows,
        page,
        rows_per_page,
        total_pages: total_rows.div_ceil(rows_per_page),
        has_next: end < total_rows,
        has_previous: page > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(rows: usize) -> RawTable {
        RawTable::new(
            vec!["n".to_string()],
            (0..rows).map(|i| vec![json!(i)]).collect(),
        )
    }

    #[test]
    fn test_first_and_last_page() {
        let t = table(25);

        let first = paginate(&t, 10, 1);
        assert_eq!(first.rows.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = paginate(&t, 10, 3);
        assert_eq!(last.rows.len(), 5);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = paginate(&table(5), 10, 4);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_rows, 5);
        assert!(!page.has_next);
    }

    #[test]
    fn test_zero_inputs_are_clamped() {
        let page = paginate(&table(3), 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.rows_per_page, 1);
        assert_eq!(page.rows.len(), 1);
    }
}

mod column;
mod materialize;
mod result_set;
mod row;

pub use column::{ColumnField, ColumnInfo};
pub use materialize::Materializer;
pub use result_set::ResultSet;
pub use row::CustomDbRow;

use serde_json::Value as JsonValue;

use crate::types::RowValues;

/// Rows returned by [`Database::get_results`](crate::Database::get_results), shaped
/// according to the requested [`OutputFormat`](crate::types::OutputFormat).
#[derive(Debug, Clone)]
pub enum FetchedRows {
    Object(Vec<CustomDbRow>),
    Numeric(Vec<Vec<RowValues>>),
    Json(JsonValue),
}

impl FetchedRows {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            FetchedRows::Object(rows) => rows.len(),
            FetchedRows::Numeric(rows) => rows.len(),
            FetchedRows::Json(value) => value.as_array().map_or(0, Vec::len),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row shaped like [`FetchedRows`].
#[derive(Debug, Clone)]
pub enum FetchedRow {
    Object(CustomDbRow),
    Numeric(Vec<RowValues>),
    Json(JsonValue),
}

use std::collections::HashMap;
use std::sync::Arc;

use super::column::ColumnInfo;
use super::row::{CustomDbRow, build_index};
use crate::types::RowValues;

/// A result set from a database query
///
/// Holds the materialized rows of one read statement together with the
/// column metadata the driver reported for it.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column metadata in driver order
    columns: Vec<ColumnInfo>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column metadata for this result set (names are shared by all rows)
    pub fn set_columns(&mut self, columns: Vec<ColumnInfo>) {
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        self.column_index = Arc::new(build_index(&names));
        self.column_names = Some(Arc::new(names));
        self.columns = columns;
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Add a row to the result set. Rows pushed before any columns are set are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            let row = CustomDbRow::with_index(
                column_names.clone(),
                self.column_index.clone(),
                row_values,
            );
            self.results.push(row);
        }
    }

    /// Plain value vectors, column order preserved.
    #[must_use]
    pub fn to_value_rows(&self) -> Vec<Vec<RowValues>> {
        self.results.iter().map(|row| row.rows.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_columns(vec![ColumnInfo::named("a"), ColumnInfo::named("b")]);
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Null]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("x".into())]);

        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_names,
            &rs.results[1].column_names
        ));
        assert_eq!(rs.results[1].get("b"), Some(&RowValues::Text("x".into())));
    }

    #[test]
    fn rows_without_columns_are_ignored() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
    }
}

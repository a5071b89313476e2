use super::column::ColumnInfo;
use super::result_set::ResultSet;
use crate::error::SqlDbalError;
use crate::types::RowValues;

/// Collects a driver's rows into a [`ResultSet`].
///
/// Adapters convert each native value to [`RowValues`] and push whole rows;
/// the materializer enforces that every row matches the column count. Columns
/// whose driver did not report a maximum length get the widest value observed.
#[derive(Debug, Default)]
pub struct Materializer {
    result_set: ResultSet,
    observed_max: Vec<usize>,
    column_count: usize,
}

impl Materializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column metadata. Must be called before any row is pushed.
    pub fn set_columns(&mut self, columns: Vec<ColumnInfo>) {
        self.column_count = columns.len();
        self.observed_max = vec![0; columns.len()];
        self.result_set.set_columns(columns);
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn reserve(&mut self, additional: usize) {
        self.result_set.results.reserve(additional);
    }

    /// Append one row in column order.
    ///
    /// # Errors
    /// Returns `SqlDbalError::Other` when no columns were set or the row width differs.
    pub fn push_row(&mut self, values: Vec<RowValues>) -> Result<(), SqlDbalError> {
        if self.result_set.get_column_names().is_none() {
            return Err(SqlDbalError::Other(
                "No column names available".to_string(),
            ));
        }
        if values.len() != self.column_count {
            return Err(SqlDbalError::Other(format!(
                "row has {} values but the statement reported {} columns",
                values.len(),
                self.column_count
            )));
        }
        for (slot, value) in self.observed_max.iter_mut().zip(values.iter()) {
            *slot = (*slot).max(display_len(value));
        }
        self.result_set.add_row_values(values);
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> ResultSet {
        let Materializer {
            mut result_set,
            observed_max,
            ..
        } = self;
        if result_set.is_empty() {
            return result_set;
        }
        let needs_fill = result_set.columns().iter().any(|c| c.max_length.is_none());
        if needs_fill {
            let columns = result_set
                .columns()
                .iter()
                .zip(observed_max)
                .map(|(col, seen)| {
                    let mut col = col.clone();
                    col.max_length = col.max_length.or(Some(seen));
                    col
                })
                .collect();
            let rows = std::mem::take(&mut result_set.results);
            result_set.set_columns(columns);
            for row in rows {
                result_set.add_row_values(row.rows);
            }
        }
        result_set
    }
}

fn display_len(value: &RowValues) -> usize {
    match value {
        RowValues::Null => 0,
        RowValues::Text(s) => s.len(),
        RowValues::Blob(b) => b.len(),
        other => other.to_string().len(),
    }
}

use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::error::SqlDbalError;
use crate::results::{ColumnInfo, Materializer};
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlDbalError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlDbalError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Column metadata as declared in the schema. Expressions have no declared type.
fn column_info(stmt: &Statement<'_>) -> Vec<ColumnInfo> {
    stmt.columns()
        .iter()
        .map(|col| {
            let declared = col.decl_type().map(str::to_string);
            let max_length = declared.as_deref().and_then(declared_length);
            ColumnInfo::new(col.name(), declared, max_length)
        })
        .collect()
}

/// Length from a declaration like `VARCHAR(50)`.
fn declared_length(decl: &str) -> Option<usize> {
    let open = decl.find('(')?;
    let close = decl[open..].find(')')? + open;
    decl[open + 1..close].split(',').next()?.trim().parse().ok()
}

/// Run a statement and push every row into `out`.
///
/// # Errors
/// Returns `SqlDbalError::SqliteError` if execution or row extraction fails.
pub fn build_result_set(
    stmt: &mut Statement<'_>,
    params: &[Value],
    out: &mut Materializer,
) -> Result<(), SqlDbalError> {
    out.set_columns(column_info(stmt));
    let col_count = out.column_count();

    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        out.push_row(row_values)?;
    }

    Ok(())
}

use std::error::Error;
use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Row, Statement};

use crate::error::SqlDbalError;
use crate::results::{ColumnInfo, Materializer};
use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// `numeric` decoded from the binary wire format into the nearest `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgNumeric(pub f64);

fn read_u16(raw: &[u8], at: usize) -> Result<u16, BoxError> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "truncated numeric value".into())
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let ndigits = usize::from(read_u16(raw, 0)?);
        let weight = i32::from(i16::from_be_bytes(read_u16(raw, 2)?.to_be_bytes()));
        let sign = read_u16(raw, 4)?;
        match sign {
            NUMERIC_NAN => return Ok(PgNumeric(f64::NAN)),
            NUMERIC_PINF => return Ok(PgNumeric(f64::INFINITY)),
            NUMERIC_NINF => return Ok(PgNumeric(f64::NEG_INFINITY)),
            _ => {}
        }
        let digits = (0..ndigits)
            .map(|i| read_u16(raw, 8 + 2 * i))
            .collect::<Result<Vec<_>, _>>()?;
        // base-10000 digit at position `idx`; positions outside the stored range are zero
        let digit = |idx: i32| {
            usize::try_from(idx)
                .ok()
                .and_then(|i| digits.get(i))
                .copied()
                .unwrap_or(0)
        };

        let mut text = String::with_capacity(ndigits * 4 + 8);
        if sign == NUMERIC_NEG {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        }
        for idx in 0..=weight {
            if idx == 0 {
                write!(text, "{}", digit(idx))?;
            } else {
                write!(text, "{:04}", digit(idx))?;
            }
        }
        text.push('.');
        let ndigits = i32::try_from(ndigits)?;
        for idx in weight + 1..=(ndigits - 1).max(weight + 1) {
            write!(text, "{:04}", digit(idx))?;
        }
        Ok(PgNumeric(text.parse()?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// `uuid` as its hyphenated text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgUuid(pub String);

impl<'a> FromSql<'a> for PgUuid {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if raw.len() != 16 {
            return Err(format!("uuid must be 16 bytes, got {}", raw.len()).into());
        }
        let mut text = String::with_capacity(36);
        for (i, b) in raw.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                text.push('-');
            }
            write!(text, "{b:02x}")?;
        }
        Ok(PgUuid(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::UUID
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, SqlDbalError> {
    Ok(row.try_get(idx)?)
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlDbalError` if the column cannot be retrieved, or
/// `SqlDbalError::Unimplemented` for a type with no canonical value.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlDbalError> {
    let type_info = row.columns()[idx].type_();

    let value = match type_info.name() {
        "int2" => get::<i16>(row, idx)?.map(|v| RowValues::Int(i64::from(v))),
        "int4" => get::<i32>(row, idx)?.map(|v| RowValues::Int(i64::from(v))),
        "int8" => get::<i64>(row, idx)?.map(RowValues::Int),
        "oid" => get::<u32>(row, idx)?.map(|v| RowValues::Int(i64::from(v))),
        "float4" => get::<f32>(row, idx)?.map(|v| RowValues::Float(f64::from(v))),
        "float8" => get::<f64>(row, idx)?.map(RowValues::Float),
        "numeric" => get::<PgNumeric>(row, idx)?.map(|n| RowValues::Float(n.0)),
        "bool" => get::<bool>(row, idx)?.map(RowValues::Bool),
        "timestamp" => get::<NaiveDateTime>(row, idx)?.map(RowValues::Timestamp),
        "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        "date" => get::<NaiveDate>(row, idx)?
            .map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN))),
        "time" => get::<NaiveTime>(row, idx)?
            .map(|t| RowValues::Text(t.format("%H:%M:%S%.f").to_string())),
        "uuid" => get::<PgUuid>(row, idx)?.map(|u| RowValues::Text(u.0)),
        "json" | "jsonb" => get::<Value>(row, idx)?.map(RowValues::JSON),
        "bytea" => get::<Vec<u8>>(row, idx)?.map(RowValues::Blob),
        "text" | "varchar" | "bpchar" | "name" | "unknown" | "citext" => {
            get::<String>(row, idx)?.map(RowValues::Text)
        }
        other => {
            return Err(SqlDbalError::Unimplemented(format!(
                "no conversion for Postgres column type {other}"
            )));
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Column metadata from a prepared statement.
#[must_use]
pub fn column_info(stmt: &Statement) -> Vec<ColumnInfo> {
    stmt.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), Some(col.type_().name().to_string()), None))
        .collect()
}

/// Push fetched rows into `out` using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    stmt: &Statement,
    rows: &[Row],
    out: &mut Materializer,
) -> Result<(), SqlDbalError> {
    out.set_columns(column_info(stmt));
    out.reserve(rows.len());
    let column_count = out.column_count();

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        out.push_row(row_values)?;
    }

    Ok(())
}

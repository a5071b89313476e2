use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::{Client, Column, ColumnData, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use super::params::bind_query_params;
use crate::error::SqlDbalError;
use crate::results::{ColumnInfo, Materializer};
use crate::types::RowValues;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Column metadata as reported in the TDS column descriptors.
fn column_info(columns: &[Column]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| ColumnInfo::new(col.name(), Some(format!("{:?}", col.column_type())), None))
        .collect()
}

/// Run a query and push its first result into `out`.
///
/// # Errors
/// Returns `SqlDbalError::MssqlError` if execution or row fetching fails, and
/// `SqlDbalError::Unimplemented` for column types with no canonical value.
pub async fn build_result_set(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
    out: &mut Materializer,
) -> Result<(), SqlDbalError> {
    let query_builder = bind_query_params(query, params);
    let mut stream = query_builder.query(client).await?;

    let columns = stream.columns().await?.map(column_info).unwrap_or_default();
    out.set_columns(columns);
    let col_count = out.column_count();

    let mut rows_stream = stream.into_row_stream();
    while let Some(row) = rows_stream.try_next().await? {
        let mut row_values = Vec::with_capacity(col_count);
        for data in row {
            row_values.push(mssql_extract_value(&data)?);
        }
        out.push_row(row_values)?;
    }

    Ok(())
}

/// Convert one TDS value to a `RowValues`.
///
/// Decimals become floats, dates become midnight timestamps, times and GUIDs
/// become text.
///
/// # Errors
/// Returns `SqlDbalError::Unimplemented` for XML, UDT and variant columns.
pub fn mssql_extract_value(data: &ColumnData<'static>) -> Result<RowValues, SqlDbalError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| RowValues::Text(s.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| RowValues::Blob(b.to_vec())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(f64::from(n))),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(RowValues::Timestamp)
        }
        ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN)))
        }
        ColumnData::Time(_) => NaiveTime::from_sql(data)?
            .map(|t| RowValues::Text(t.format("%H:%M:%S%.f").to_string())),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(data)?.map(|dt| RowValues::Timestamp(dt.naive_utc()))
        }
        other => {
            return Err(SqlDbalError::Unimplemented(format!(
                "no conversion for SQL Server value {other:?}"
            )));
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Run a statement and sum the affected rows of every result.
///
/// # Errors
/// Returns `SqlDbalError::MssqlError` if execution fails.
pub async fn execute_dml(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlDbalError> {
    let query_builder = bind_query_params(query, params);
    let exec_result = query_builder.execute(client).await?;
    let rows_affected: u64 = exec_result.rows_affected().iter().sum();

    usize::try_from(rows_affected)
        .map_err(|e| SqlDbalError::Other(format!("Invalid rows affected count: {e}")))
}

/// `@@IDENTITY` of the session, `None` before any identity insert.
///
/// # Errors
/// Returns `SqlDbalError::MssqlError` if the lookup fails.
pub async fn last_identity(client: &mut MssqlClient) -> Result<Option<i64>, SqlDbalError> {
    let row = client
        .simple_query("SELECT CAST(@@IDENTITY AS BIGINT)")
        .await?
        .into_row()
        .await?;
    Ok(row.and_then(|r| r.try_get::<i64, _>(0).ok().flatten()))
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use tiberius::IntoSql;
    use tiberius::numeric::Numeric;

    use super::*;

    #[test]
    fn integers_and_floats() {
        assert_eq!(mssql_extract_value(&ColumnData::U8(Some(7))).unwrap(), RowValues::Int(7));
        assert_eq!(mssql_extract_value(&ColumnData::I16(Some(-2))).unwrap(), RowValues::Int(-2));
        assert_eq!(mssql_extract_value(&ColumnData::I32(Some(40))).unwrap(), RowValues::Int(40));
        assert_eq!(mssql_extract_value(&ColumnData::I64(None)).unwrap(), RowValues::Null);
        assert_eq!(
            mssql_extract_value(&ColumnData::F32(Some(1.5))).unwrap(),
            RowValues::Float(1.5)
        );
        assert_eq!(mssql_extract_value(&ColumnData::Bit(Some(true))).unwrap(), RowValues::Bool(true));
    }

    #[test]
    fn decimal_becomes_float() {
        let avg = ColumnData::Numeric(Some(Numeric::new_with_scale(12325, 2)));
        assert_eq!(mssql_extract_value(&avg).unwrap(), RowValues::Float(123.25));
        assert_eq!(mssql_extract_value(&ColumnData::Numeric(None)).unwrap(), RowValues::Null);
    }

    #[test]
    fn text_binary_and_guid() {
        let text = ColumnData::String(Some(Cow::Owned("Oslo".to_string())));
        assert_eq!(mssql_extract_value(&text).unwrap(), RowValues::from("Oslo"));
        let blob = ColumnData::Binary(Some(Cow::Owned(vec![0xde, 0xad])));
        assert_eq!(mssql_extract_value(&blob).unwrap(), RowValues::Blob(vec![0xde, 0xad]));

        let guid = tiberius::Uuid::from_u128(0x67e5_5044_10b1_426f_9247_bb68_0e5f_e0c8);
        assert_eq!(
            mssql_extract_value(&ColumnData::Guid(Some(guid))).unwrap(),
            RowValues::from("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
    }

    #[test]
    fn dates_and_times() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let midnight = day.and_time(NaiveTime::MIN);
        assert_eq!(
            mssql_extract_value(&day.into_sql()).unwrap(),
            RowValues::Timestamp(midnight)
        );

        let stamp = day.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(
            mssql_extract_value(&stamp.into_sql()).unwrap(),
            RowValues::Timestamp(stamp)
        );

        let time = NaiveTime::from_hms_opt(8, 30, 15).unwrap();
        assert_eq!(
            mssql_extract_value(&time.into_sql()).unwrap(),
            RowValues::from("08:30:15")
        );

        let offset = DateTime::<Utc>::from_naive_utc_and_offset(stamp, Utc);
        assert_eq!(
            mssql_extract_value(&offset.into_sql()).unwrap(),
            RowValues::Timestamp(stamp)
        );
    }

    #[test]
    fn xml_has_no_canonical_value() {
        let xml = ColumnData::Xml(None);
        assert!(matches!(
            mssql_extract_value(&xml),
            Err(SqlDbalError::Unimplemented(_))
        ));
    }
}

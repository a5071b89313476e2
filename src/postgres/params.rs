use std::error::Error;

use chrono::{TimeZone, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Borrow parameters in the shape tokio-postgres expects.
#[must_use]
pub fn as_refs(params: &[RowValues]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn mismatch(value: &RowValues, ty: &Type) -> BoxError {
    format!("cannot bind a {} value to a {ty} parameter", value.type_name()).into()
}

/// Whole floats only; anything fractional or out of range is refused.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(f: f64) -> Result<i64, BoxError> {
    if f.fract() != 0.0 || !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(format!("{f} is not representable as an integer").into());
    }
    Ok(f as i64)
}

fn int_to_sql(i: i64, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        _ => Err(mismatch(&RowValues::Int(i), ty)),
    }
}

impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
        match (self, ty) {
            (RowValues::Null, _) => Ok(IsNull::Yes),
            (RowValues::Int(i), _) => int_to_sql(*i, ty, out),
            #[allow(clippy::cast_possible_truncation)]
            (RowValues::Float(f), &Type::FLOAT4) => (*f as f32).to_sql(ty, out),
            (RowValues::Float(f), &Type::FLOAT8) => f.to_sql(ty, out),
            (RowValues::Float(f), &(Type::INT2 | Type::INT4 | Type::INT8)) => {
                int_to_sql(float_to_int(*f)?, ty, out)
            }
            (RowValues::Text(s), &(Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)) => {
                s.to_sql(ty, out)
            }
            (RowValues::Text(s), &(Type::JSON | Type::JSONB)) => {
                serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
            }
            (RowValues::Bool(b), &Type::BOOL) => b.to_sql(ty, out),
            (RowValues::Timestamp(dt), &Type::TIMESTAMP) => dt.to_sql(ty, out),
            (RowValues::Timestamp(dt), &Type::TIMESTAMPTZ) => {
                Utc.from_utc_datetime(dt).to_sql(ty, out)
            }
            (RowValues::Timestamp(dt), &Type::DATE) => dt.date().to_sql(ty, out),
            (RowValues::JSON(v), &(Type::JSON | Type::JSONB)) => v.to_sql(ty, out),
            (RowValues::Blob(b), &Type::BYTEA) => b.to_sql(ty, out),
            (value, _) => Err(mismatch(value, ty)),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Wire bytes for `value` bound to `ty`, and whether it went out as NULL.
    fn encode(value: &RowValues, ty: &Type) -> Result<(bool, Vec<u8>), BoxError> {
        let mut buf = bytes::BytesMut::new();
        let is_null = value.to_sql_checked(ty, &mut buf)?;
        Ok((matches!(is_null, IsNull::Yes), buf.to_vec()))
    }

    fn bytes8(buf: &[u8]) -> [u8; 8] {
        buf.try_into().unwrap()
    }

    #[test]
    fn int_widens_to_float_columns() {
        let (_, buf) = encode(&RowValues::Int(5), &Type::FLOAT8).unwrap();
        assert_eq!(f64::from_be_bytes(bytes8(&buf)), 5.0);

        let (_, buf) = encode(&RowValues::Int(-3), &Type::FLOAT4).unwrap();
        assert_eq!(f32::from_be_bytes(buf.try_into().unwrap()), -3.0);
    }

    #[test]
    fn int_narrows_with_range_check() {
        let (_, buf) = encode(&RowValues::Int(7), &Type::INT2).unwrap();
        assert_eq!(i16::from_be_bytes(buf.try_into().unwrap()), 7);
        let (_, buf) = encode(&RowValues::Int(7), &Type::INT8).unwrap();
        assert_eq!(i64::from_be_bytes(bytes8(&buf)), 7);

        assert!(encode(&RowValues::Int(70_000), &Type::INT2).is_err());
        assert!(encode(&RowValues::Int(i64::MAX), &Type::INT4).is_err());
    }

    #[test]
    fn whole_float_binds_to_int_columns() {
        let (_, buf) = encode(&RowValues::Float(42.0), &Type::INT4).unwrap();
        assert_eq!(i32::from_be_bytes(buf.try_into().unwrap()), 42);
        let (_, buf) = encode(&RowValues::Float(-8.0), &Type::INT8).unwrap();
        assert_eq!(i64::from_be_bytes(bytes8(&buf)), -8);
    }

    #[test]
    fn fractional_float_is_refused_for_int_columns() {
        assert!(encode(&RowValues::Float(2.5), &Type::INT8).is_err());
        assert!(encode(&RowValues::Float(f64::NAN), &Type::INT4).is_err());
        assert!(encode(&RowValues::Float(1e300), &Type::INT8).is_err());
    }

    #[test]
    fn float_keeps_float_encoding() {
        let (_, buf) = encode(&RowValues::Float(1.25), &Type::FLOAT8).unwrap();
        assert_eq!(f64::from_be_bytes(bytes8(&buf)), 1.25);
        let (_, buf) = encode(&RowValues::Float(1.25), &Type::FLOAT4).unwrap();
        assert_eq!(f32::from_be_bytes(buf.try_into().unwrap()), 1.25);
    }

    #[test]
    fn mismatched_kinds_are_rejected() {
        assert!(encode(&RowValues::Text("5".into()), &Type::INT4).is_err());
        assert!(encode(&RowValues::Bool(true), &Type::TEXT).is_err());
        assert!(encode(&RowValues::Int(1), &Type::BOOL).is_err());
        assert!(encode(&RowValues::Blob(vec![1]), &Type::TEXT).is_err());
        assert!(encode(&RowValues::JSON(serde_json::json!(1)), &Type::INT8).is_err());
        let err = encode(&RowValues::Int(1), &Type::TEXT).unwrap_err();
        assert!(err.to_string().contains("int"));
    }

    #[test]
    fn text_and_json_paths() {
        let (_, buf) = encode(&RowValues::Text("abc".into()), &Type::VARCHAR).unwrap();
        assert_eq!(buf, b"abc");
        // jsonb carries a version byte ahead of the document
        let (_, buf) = encode(&RowValues::Text("{\"a\":1}".into()), &Type::JSONB).unwrap();
        assert_eq!(buf[0], 1);
        assert!(encode(&RowValues::Text("not json".into()), &Type::JSON).is_err());
    }

    #[test]
    fn timestamps_bind_to_date_and_time_columns() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let value = RowValues::Timestamp(dt);
        assert!(encode(&value, &Type::TIMESTAMP).is_ok());
        assert!(encode(&value, &Type::TIMESTAMPTZ).is_ok());
        assert!(encode(&value, &Type::DATE).is_ok());
        assert!(encode(&value, &Type::INT8).is_err());
    }

    #[test]
    fn null_binds_anywhere_accepted() {
        let (is_null, buf) = encode(&RowValues::Null, &Type::INT4).unwrap();
        assert!(is_null);
        assert!(buf.is_empty());
    }
}

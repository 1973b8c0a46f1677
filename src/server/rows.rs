//! Result-row decoding, driven by the wire type Postgres reports for each
//! column.
//!
//! The SELECT builder already cast anything the driver cannot decode to
//! text, so those columns arrive here as plain strings with their original
//! names. Anything that still reaches the fallback arm is a type the
//! builder should have cast, and the decode error names the column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::catalog::type_map::{
    OID_BOOL, OID_BPCHAR, OID_DATE, OID_FLOAT4, OID_FLOAT8, OID_INT2, OID_INT4, OID_INT8,
    OID_JSON, OID_JSONB, OID_NAME, OID_TEXT, OID_TIME, OID_TIMESTAMP, OID_TIMESTAMPTZ, OID_UUID,
    OID_VARCHAR,
};

use super::errors::ResolveError;

// Built-in array type oids for elements we decode natively.
const OID_BOOL_ARRAY: u32 = 1000;
const OID_NAME_ARRAY: u32 = 1003;
const OID_INT2_ARRAY: u32 = 1005;
const OID_INT4_ARRAY: u32 = 1007;
const OID_TEXT_ARRAY: u32 = 1009;
const OID_BPCHAR_ARRAY: u32 = 1014;
const OID_VARCHAR_ARRAY: u32 = 1015;
const OID_INT8_ARRAY: u32 = 1016;
const OID_FLOAT4_ARRAY: u32 = 1021;
const OID_FLOAT8_ARRAY: u32 = 1022;
const OID_UUID_ARRAY: u32 = 2951;

/// Decode one row into a JSON object whose keys follow the SELECT list,
/// which in turn follows attribute ordinal order.
pub(super) fn row_to_json(row: &Row) -> Result<Map<String, Value>, ResolveError> {
    let mut out = Map::with_capacity(row.columns().len());
    for (idx, col) in row.columns().iter().enumerate() {
        let value = decode_cell(row, idx, col.type_().oid()).map_err(|source| {
            ResolveError::Decode { column: col.name().to_string(), source }
        })?;
        out.insert(col.name().to_string(), value);
    }
    Ok(out)
}

fn decode_cell(row: &Row, idx: usize, type_oid: u32) -> Result<Value, tokio_postgres::Error> {
    let value = match type_oid {
        OID_BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        OID_INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| Value::Number(v.into())),
        OID_INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| Value::Number(v.into())),
        OID_INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map(|v| Value::Number(v.into())),
        OID_FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| float_value(f64::from(v))),
        OID_FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(float_value),
        OID_TEXT | OID_VARCHAR | OID_BPCHAR | OID_NAME => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::String)
        }
        OID_DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Value::String(v.to_string())),
        OID_TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| Value::String(v.to_string())),
        OID_TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        OID_TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| Value::String(v.to_rfc3339())),
        OID_UUID => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(|v| Value::String(v.to_string())),
        OID_JSON | OID_JSONB => row.try_get::<_, Option<Value>>(idx)?,
        OID_BOOL_ARRAY => row
            .try_get::<_, Option<Vec<bool>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(Value::Bool).collect())),
        OID_INT2_ARRAY => row
            .try_get::<_, Option<Vec<i16>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(|x| Value::Number(x.into())).collect())),
        OID_INT4_ARRAY => row
            .try_get::<_, Option<Vec<i32>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(|x| Value::Number(x.into())).collect())),
        OID_INT8_ARRAY => row
            .try_get::<_, Option<Vec<i64>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(|x| Value::Number(x.into())).collect())),
        OID_FLOAT4_ARRAY => row.try_get::<_, Option<Vec<f32>>>(idx)?.map(|v| {
            Value::Array(v.into_iter().map(|x| float_value(f64::from(x))).collect())
        }),
        OID_FLOAT8_ARRAY => row
            .try_get::<_, Option<Vec<f64>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(float_value).collect())),
        OID_TEXT_ARRAY | OID_VARCHAR_ARRAY | OID_BPCHAR_ARRAY | OID_NAME_ARRAY => row
            .try_get::<_, Option<Vec<String>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(Value::String).collect())),
        OID_UUID_ARRAY => row
            .try_get::<_, Option<Vec<Uuid>>>(idx)?
            .map(|v| Value::Array(v.into_iter().map(|x| Value::String(x.to_string())).collect())),
        _ => row.try_get::<_, Option<String>>(idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// JSON numbers cannot carry NaN or infinity; those become null.
fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

//! Normalization of PostgreSQL rows into JSON.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use fallible_iterator::FallibleIterator;
use postgres_protocol::types as protocol;
use postgres_types::{FromSql, Kind, Type};
use serde_json::{Number, Value};
use sqlgate_query::{Column, Row as JsonRow};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{PgError, PgResult};
use crate::wire::{self, Interval, TimeTz, WireResult};

/// A column value decoded from its binary wire format into JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded(pub Value);

impl<'a> FromSql<'a> for Decoded {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> WireResult<Self> {
        decode_value(ty, raw).map(Self)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Column descriptors in statement order.
pub fn columns(stmt_columns: &[tokio_postgres::Column]) -> Vec<Column> {
    stmt_columns.iter().map(|c| Column::new(c.name())).collect()
}

/// Convert a row into a JSON object keyed by column name.
pub fn row_to_json(row: &Row) -> PgResult<JsonRow> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = row.try_get::<_, Option<Decoded>>(idx).map_err(|e| {
                PgError::deserialization(format!(
                    "failed to decode column '{}': {}",
                    column.name(),
                    e
                ))
            })?;
            Ok((column.name().to_string(), value.map(|d| d.0).unwrap_or(Value::Null)))
        })
        .collect()
}

/// Decode one non-null value of type `ty`.
///
/// Domains decode as their base type and arrays keep their nesting. Types
/// without a mapping come back as base64 of their wire bytes.
pub fn decode_value(ty: &Type, raw: &[u8]) -> WireResult<Value> {
    match ty.kind() {
        Kind::Array(member) => return decode_array(member, raw),
        Kind::Domain(base) => return decode_value(base, raw),
        _ => {}
    }

    let value = match *ty {
        Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
        Type::INT2 => Value::from(i16::from_sql(ty, raw)?),
        Type::INT4 => Value::from(i32::from_sql(ty, raw)?),
        Type::INT8 => Value::from(i64::from_sql(ty, raw)?),
        Type::OID => Value::from(u32::from_sql(ty, raw)?),
        Type::CHAR => Value::String(char::from(i8::from_sql(ty, raw)? as u8).to_string()),
        Type::FLOAT4 => float(f64::from(f32::from_sql(ty, raw)?)),
        Type::FLOAT8 => float(f64::from_sql(ty, raw)?),
        Type::NUMERIC => Value::String(wire::numeric_to_string(raw)?),
        Type::MONEY => Value::String(wire::money_to_string(raw)?),
        Type::JSON | Type::JSONB => Value::from_sql(ty, raw)?,
        Type::UUID => Value::String(Uuid::from_sql(ty, raw)?.to_string()),
        Type::DATE => Value::String(NaiveDate::from_sql(ty, raw)?.to_string()),
        Type::TIME => Value::String(NaiveTime::from_sql(ty, raw)?.to_string()),
        Type::TIMETZ => Value::String(TimeTz::decode(raw)?.to_string()),
        Type::TIMESTAMP => Value::String(format_timestamp(NaiveDateTime::from_sql(ty, raw)?)),
        Type::TIMESTAMPTZ => Value::String(format_timestamptz(DateTime::<Utc>::from_sql(ty, raw)?)),
        Type::INTERVAL => Value::String(Interval::decode(raw)?.to_string()),
        Type::INET | Type::CIDR => Value::String(wire::inet_to_string(ty, raw)?),
        Type::MACADDR => Value::String(wire::macaddr_to_string(raw)?),
        _ if wire::is_text_format(ty) => Value::String(protocol::text_from_sql(raw)?.to_string()),
        // bytea and anything unmapped
        _ => Value::String(BASE64.encode(raw)),
    };
    Ok(value)
}

fn decode_array(member: &Type, raw: &[u8]) -> WireResult<Value> {
    let array = protocol::array_from_sql(raw)?;
    let dimensions = array
        .dimensions()
        .map(|d| Ok(usize::try_from(d.len)?))
        .collect::<Vec<usize>>()?;
    let elements = array
        .values()
        .map(|element| match element {
            Some(raw) => decode_value(member, raw),
            None => Ok(Value::Null),
        })
        .collect::<Vec<Value>>()?;

    let mut elements = elements.into_iter();
    Ok(nest(&dimensions, &mut elements))
}

/// Rebuild the row-major element list into nested JSON arrays.
fn nest(dimensions: &[usize], elements: &mut impl Iterator<Item = Value>) -> Value {
    match dimensions.split_first() {
        None => Value::Array(Vec::new()),
        Some((&len, [])) => Value::Array(elements.by_ref().take(len).collect()),
        Some((&len, inner)) => Value::Array((0..len).map(|_| nest(inner, elements)).collect()),
    }
}

/// Non-finite floats have no JSON representation and become strings.
pub fn float(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

/// `2024-05-01T10:20:30.123`
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// `2024-05-01T10:20:30.123Z`
pub fn format_timestamptz(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

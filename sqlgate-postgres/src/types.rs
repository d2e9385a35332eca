//! Conversion of JSON bind values into PostgreSQL parameters.
//!
//! Values are converted according to the parameter types PostgreSQL inferred
//! when preparing the statement, so `SELECT $1::int` receives an `int4` even
//! when the caller sent the number as a string. Every parameter is encoded
//! up front in the binary format of its type.

use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use postgres_protocol::types::{self as protocol, ArrayDimension};
use postgres_types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{PgError, PgResult};
use crate::wire::{self, Interval, TimeTz};

/// A parameter already encoded for its declared type; `None` binds NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded(Option<BytesMut>);

impl Encoded {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

impl ToSql for Encoded {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match &self.0 {
            Some(bytes) => {
                out.extend_from_slice(bytes);
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Convert positional values for a prepared statement.
pub fn json_values_to_params(values: &[Value], types: &[Type]) -> PgResult<Vec<Encoded>> {
    if values.len() != types.len() {
        return Err(PgError::query(format!(
            "statement expects {} parameters but {} values were supplied",
            types.len(),
            values.len()
        )));
    }

    values
        .iter()
        .zip(types)
        .map(|(value, ty)| json_to_sql(value, ty))
        .collect()
}

/// Convert one JSON value into a parameter of type `ty`. `null` binds SQL NULL.
pub fn json_to_sql(value: &Value, ty: &Type) -> PgResult<Encoded> {
    if value.is_null() {
        return Ok(Encoded(None));
    }
    let mut out = BytesMut::new();
    write_value(value, ty, &mut out)?;
    Ok(Encoded(Some(out)))
}

fn write_value(value: &Value, ty: &Type, out: &mut BytesMut) -> PgResult<()> {
    match ty.kind() {
        Kind::Array(member) => return write_array(value, ty, member, out),
        Kind::Domain(base) => return write_value(value, base, out),
        _ => {}
    }

    match *ty {
        Type::BOOL => put(to_bool(value, ty)?, ty, out),
        Type::INT2 => put(to_int::<i16>(value, ty)?, ty, out),
        Type::INT4 => put(to_int::<i32>(value, ty)?, ty, out),
        Type::INT8 => put(to_int::<i64>(value, ty)?, ty, out),
        Type::OID => put(to_int::<u32>(value, ty)?, ty, out),
        Type::CHAR => put(to_char(value, ty)?, ty, out),
        Type::FLOAT4 => put(to_float(value, ty)? as f32, ty, out),
        Type::FLOAT8 => put(to_float(value, ty)?, ty, out),
        Type::NUMERIC => {
            wire::encode_numeric(&number_text(value, ty)?, out).ok_or_else(|| mismatch(value, ty))
        }
        Type::MONEY => {
            let cents = wire::parse_money(&number_text(value, ty)?).ok_or_else(|| mismatch(value, ty))?;
            wire::encode_money(cents, out);
            Ok(())
        }
        Type::JSON | Type::JSONB => put(value, ty, out),
        Type::UUID => put(parse_with(value, ty, |s| s.parse::<Uuid>().ok())?, ty, out),
        Type::DATE => put(parse_with(value, ty, |s| s.parse::<NaiveDate>().ok())?, ty, out),
        Type::TIME => put(parse_with(value, ty, |s| s.parse::<NaiveTime>().ok())?, ty, out),
        Type::TIMETZ => {
            parse_with(value, ty, TimeTz::parse)?.encode(out);
            Ok(())
        }
        Type::TIMESTAMP => put(parse_with(value, ty, parse_timestamp)?, ty, out),
        Type::TIMESTAMPTZ => put(parse_with(value, ty, parse_timestamptz)?, ty, out),
        Type::INTERVAL => {
            // A bare number counts seconds.
            let text = number_text(value, ty)?;
            Interval::parse(&text).ok_or_else(|| mismatch(value, ty))?.encode(out);
            Ok(())
        }
        Type::INET | Type::CIDR => {
            let (addr, netmask) = parse_with(value, ty, wire::parse_inet)?;
            wire::encode_inet(addr, netmask, out);
            Ok(())
        }
        Type::MACADDR => {
            wire::encode_macaddr(parse_with(value, ty, wire::parse_macaddr)?, out);
            Ok(())
        }
        Type::BYTEA => {
            protocol::bytea_to_sql(to_text(value).as_bytes(), out);
            Ok(())
        }
        _ if wire::is_text_format(ty) => {
            protocol::text_to_sql(&to_text(value), out);
            Ok(())
        }
        _ => Err(PgError::type_conversion(format!(
            "binding parameters of type {ty} is not supported"
        ))),
    }
}

/// Encode a JSON array, nested to any depth, as a rectangular array of `member`.
fn write_array(value: &Value, ty: &Type, member: &Type, out: &mut BytesMut) -> PgResult<()> {
    let Value::Array(items) = value else {
        return Err(mismatch(value, ty));
    };

    // JSON array elements of json[] are values, not dimensions.
    let nested = !matches!(*member, Type::JSON | Type::JSONB);
    let mut shape = Shape::default();
    shape.walk(items, 0, nested).ok_or_else(|| mismatch(value, ty))?;
    if !shape.is_rectangular() {
        return Err(PgError::type_conversion(format!(
            "cannot bind a ragged array as {ty}"
        )));
    }

    let elements = shape
        .leaves
        .iter()
        .map(|leaf| json_to_sql(leaf, member))
        .collect::<PgResult<Vec<Encoded>>>()?;
    let dimensions = shape
        .dimensions
        .iter()
        .map(|&len| ArrayDimension { len, lower_bound: 1 });

    protocol::array_to_sql(
        dimensions,
        member.oid(),
        elements,
        |element, buf| match element.to_sql(member, buf)? {
            IsNull::Yes => Ok(postgres_protocol::IsNull::Yes),
            IsNull::No => Ok(postgres_protocol::IsNull::No),
        },
        out,
    )
    .map_err(|e| PgError::type_conversion(e.to_string()))
}

/// Dimensions and row-major leaves of a nested JSON array.
#[derive(Default)]
struct Shape<'a> {
    dimensions: Vec<i32>,
    leaves: Vec<&'a Value>,
    leaf_depth: Option<usize>,
}

impl<'a> Shape<'a> {
    fn walk(&mut self, items: &'a [Value], depth: usize, nested: bool) -> Option<()> {
        let len = i32::try_from(items.len()).ok()?;
        match self.dimensions.get(depth) {
            Some(&expected) if expected != len => return None,
            Some(_) => {}
            None => self.dimensions.push(len),
        }

        for item in items {
            match item {
                Value::Array(inner) if nested => self.walk(inner, depth + 1, nested)?,
                leaf => {
                    if *self.leaf_depth.get_or_insert(depth) != depth {
                        return None;
                    }
                    self.leaves.push(leaf);
                }
            }
        }
        Some(())
    }

    fn is_rectangular(&self) -> bool {
        let expected: usize = self.dimensions.iter().map(|&len| len as usize).product();
        let depth_matches = self
            .leaf_depth
            .is_none_or(|depth| depth + 1 == self.dimensions.len());
        depth_matches && self.leaves.len() == expected
    }
}

fn put<T: ToSql>(value: T, ty: &Type, out: &mut BytesMut) -> PgResult<()> {
    value
        .to_sql(ty, out)
        .map(|_| ())
        .map_err(|e| PgError::type_conversion(e.to_string()))
}

fn mismatch(value: &Value, ty: &Type) -> PgError {
    PgError::type_conversion(format!("cannot bind {value} as {ty}"))
}

fn to_bool(value: &Value, ty: &Type) -> PgResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(mismatch(value, ty)),
        },
        _ => Err(mismatch(value, ty)),
    }
}

fn to_int<T: TryFrom<i64>>(value: &Value, ty: &Type) -> PgResult<T> {
    let wide = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    wide.and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| mismatch(value, ty))
}

/// `"char"` takes exactly one byte.
fn to_char(value: &Value, ty: &Type) -> PgResult<i8> {
    match value {
        Value::String(s) => match s.as_bytes() {
            [byte] => Ok(*byte as i8),
            _ => Err(mismatch(value, ty)),
        },
        _ => Err(mismatch(value, ty)),
    }
}

fn to_float(value: &Value, ty: &Type) -> PgResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(value, ty)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

/// Numbers keep their JSON spelling so no precision is lost.
fn number_text(value: &Value, ty: &Type) -> PgResult<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.trim().to_string()),
        _ => Err(mismatch(value, ty)),
    }
}

/// Text form of a value: strings as-is, everything else as JSON.
fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_with<T>(value: &Value, ty: &Type, parse: impl Fn(&str) -> Option<T>) -> PgResult<T> {
    match value {
        Value::String(s) => parse(s.trim()).ok_or_else(|| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_timestamptz(s).map(|dt| dt.naive_utc()))
}

fn parse_timestamptz(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z").ok())
}

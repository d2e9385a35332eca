//! Microsoft SQL Server row normalization.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use sqlgate_query::result::zip_row;
use sqlgate_query::{Column, Row as JsonRow};
use tiberius::{ColumnData, FromSql, Row};

use crate::error::MssqlResult;

/// Column names in result order.
pub fn columns(columns: &[tiberius::Column]) -> Vec<Column> {
    columns.iter().map(|c| Column::new(c.name())).collect()
}

/// Convert a row into a JSON object keyed by column name.
pub fn row_to_json(columns: &[Column], row: Row) -> MssqlResult<JsonRow> {
    let values = row
        .into_iter()
        .map(|data| column_data_to_json(&data))
        .collect::<MssqlResult<Vec<Value>>>()?;
    Ok(zip_row(columns, values))
}

/// Convert a single cell to JSON.
pub fn column_data_to_json(data: &ColumnData<'static>) -> MssqlResult<Value> {
    let value = match data {
        ColumnData::Bit(Some(b)) => Value::Bool(*b),
        ColumnData::U8(Some(v)) => Value::from(*v),
        ColumnData::I16(Some(v)) => Value::from(*v),
        ColumnData::I32(Some(v)) => Value::from(*v),
        ColumnData::I64(Some(v)) => Value::from(*v),
        ColumnData::F32(Some(v)) => float(f64::from(*v)),
        ColumnData::F64(Some(v)) => float(*v),
        ColumnData::Numeric(Some(n)) => float(n.value() as f64 / 10f64.powi(i32::from(n.scale()))),
        ColumnData::String(Some(s)) => Value::String(s.to_string()),
        ColumnData::Guid(Some(g)) => Value::String(g.to_string()),
        ColumnData::Binary(Some(b)) => Value::String(BASE64.encode(b)),
        ColumnData::Xml(Some(xml)) => Value::String(xml.to_string()),
        ColumnData::Date(Some(_)) => temporal::<NaiveDate>(data, |d| d.format("%Y-%m-%d").to_string())?,
        ColumnData::Time(Some(_)) => {
            temporal::<NaiveTime>(data, |t| t.format("%H:%M:%S%.f").to_string())?
        }
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_)) => {
            temporal::<NaiveDateTime>(data, |dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())?
        }
        ColumnData::DateTimeOffset(Some(_)) => {
            temporal::<DateTime<Utc>>(data, |dt| dt.to_rfc3339())?
        }
        _ => Value::Null,
    };
    Ok(value)
}

fn temporal<T>(data: &ColumnData<'static>, format: impl FnOnce(T) -> String) -> MssqlResult<Value>
where
    T: for<'a> FromSql<'a>,
{
    Ok(T::from_sql(data)?
        .map(|value| Value::String(format(value)))
        .unwrap_or(Value::Null))
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sqlgate_query::GatewayError;
    use std::borrow::Cow;
    use tiberius::numeric::Numeric;
    use tiberius::time::Date;

    fn cell(data: ColumnData<'static>) -> Value {
        column_data_to_json(&data).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(cell(ColumnData::Bit(Some(true))), json!(true));
        assert_eq!(cell(ColumnData::U8(Some(1))), json!(1));
        assert_eq!(cell(ColumnData::I64(Some(-9))), json!(-9));
        assert_eq!(cell(ColumnData::F64(Some(2.5))), json!(2.5));
        assert_eq!(
            cell(ColumnData::String(Some(Cow::Borrowed("bob")))),
            json!("bob")
        );
    }

    #[test]
    fn test_nulls() {
        assert_eq!(cell(ColumnData::I32(None)), Value::Null);
        assert_eq!(cell(ColumnData::String(None)), Value::Null);
        assert_eq!(cell(ColumnData::Date(None)), Value::Null);
    }

    #[test]
    fn test_numeric_is_number() {
        let n = Numeric::new_with_scale(1250, 2);
        assert_eq!(cell(ColumnData::Numeric(Some(n))), json!(12.5));
    }

    #[test]
    fn test_binary_is_base64() {
        let data = ColumnData::Binary(Some(Cow::Borrowed(&b"Hello"[..])));
        assert_eq!(cell(data), json!("SGVsbG8="));
    }

    #[test]
    fn test_date() {
        let data = ColumnData::Date(Some(Date::new(0)));
        assert_eq!(cell(data), json!("0001-01-01"));
    }

    #[test]
    fn test_undecodable_temporal_is_an_error() {
        let err = temporal::<NaiveDate>(&ColumnData::I32(Some(1)), |d| d.to_string()).unwrap_err();
        assert!(matches!(
            GatewayError::from(err),
            GatewayError::QueryExecutionFailed(_)
        ));
    }
}

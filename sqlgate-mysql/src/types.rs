//! Type conversion utilities for MySQL.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mysql_async::consts::ColumnType;
use mysql_async::{Column, Params, Value};
use serde_json::{Number, Value as JsonValue};

/// Character set id MySQL reports for binary strings and blobs.
const BINARY_CHARSET: u16 = 63;

/// Column metadata needed to normalize values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
    /// Declared display width.
    pub length: u32,
    /// Whether the column holds binary rather than character data.
    pub binary: bool,
}

impl From<&Column> for ColumnMeta {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name_str().into_owned(),
            column_type: column.column_type(),
            length: column.column_length(),
            binary: column.character_set() == BINARY_CHARSET,
        }
    }
}

/// Convert positional JSON values into statement parameters, in order.
pub fn json_values_to_params(values: &[JsonValue]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(json_to_mysql).collect())
    }
}

/// Convert a JSON value to a MySQL value.
pub fn json_to_mysql(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::NULL,
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Double(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => Value::from(s.as_str()),
        other => Value::from(other.to_string()),
    }
}

/// Convert a MySQL value to JSON using its column metadata.
///
/// A 0 or 1 integer in a column of width 1 (`TINYINT(1)`) becomes a boolean.
pub fn from_mysql_value(value: Value, column: &ColumnMeta) -> JsonValue {
    match value {
        Value::NULL => JsonValue::Null,
        Value::Int(i) if column.length == 1 && (i == 0 || i == 1) => JsonValue::Bool(i == 1),
        Value::UInt(u) if column.length == 1 && (u == 0 || u == 1) => JsonValue::Bool(u == 1),
        Value::Int(i) => JsonValue::Number(i.into()),
        Value::UInt(u) => JsonValue::Number(u.into()),
        Value::Float(f) => float(f64::from(f)),
        Value::Double(d) => float(d),
        Value::Bytes(bytes) => from_bytes(bytes, column),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            if column.column_type == ColumnType::MYSQL_TYPE_DATE {
                JsonValue::String(format!("{:04}-{:02}-{:02}", year, month, day))
            } else {
                let mut datetime = format!(
                    "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                );
                if micro > 0 {
                    datetime.push_str(&format!(".{:06}", micro));
                }
                JsonValue::String(datetime)
            }
        }
        Value::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            let mut time = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds
            );
            if micro > 0 {
                time.push_str(&format!(".{:06}", micro));
            }
            JsonValue::String(time)
        }
    }
}

fn from_bytes(bytes: Vec<u8>, column: &ColumnMeta) -> JsonValue {
    if column.column_type == ColumnType::MYSQL_TYPE_JSON {
        if let Ok(json) = serde_json::from_slice(&bytes) {
            return json;
        }
    }

    if column.binary {
        return JsonValue::String(BASE64.encode(&bytes));
    }

    match String::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s),
        Err(e) => JsonValue::String(BASE64.encode(e.as_bytes())),
    }
}

fn float(f: f64) -> JsonValue {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(f.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn column(column_type: ColumnType, length: u32) -> ColumnMeta {
        ColumnMeta {
            name: "c".into(),
            column_type,
            length,
            binary: false,
        }
    }

    #[test]
    fn test_params_keep_order() {
        let params = json_values_to_params(&[json!(10), json!("x")]);
        assert_eq!(
            params,
            Params::Positional(vec![Value::Int(10), Value::Bytes(b"x".to_vec())])
        );
    }

    #[test]
    fn test_empty_params() {
        assert_eq!(json_values_to_params(&[]), Params::Empty);
    }

    #[test]
    fn test_json_to_mysql() {
        assert_eq!(json_to_mysql(&JsonValue::Null), Value::NULL);
        assert_eq!(json_to_mysql(&json!(true)), Value::Int(1));
        assert_eq!(json_to_mysql(&json!(u64::MAX)), Value::UInt(u64::MAX));
        assert_eq!(json_to_mysql(&json!(2.5)), Value::Double(2.5));
        assert_eq!(json_to_mysql(&json!([1, 2])), Value::Bytes(b"[1,2]".to_vec()));
    }

    #[test]
    fn test_tinyint_one_becomes_bool() {
        let tiny = column(ColumnType::MYSQL_TYPE_TINY, 1);
        assert_eq!(from_mysql_value(Value::Int(1), &tiny), json!(true));
        assert_eq!(from_mysql_value(Value::Int(0), &tiny), json!(false));
        assert_eq!(from_mysql_value(Value::Int(5), &tiny), json!(5));
    }

    #[test]
    fn test_wider_int_unchanged() {
        let int = column(ColumnType::MYSQL_TYPE_LONG, 11);
        assert_eq!(from_mysql_value(Value::Int(1), &int), json!(1));
        assert_eq!(from_mysql_value(Value::UInt(0), &int), json!(0));
    }

    #[test]
    fn test_bytes_by_column_type() {
        let json_col = column(ColumnType::MYSQL_TYPE_JSON, 0);
        assert_eq!(
            from_mysql_value(Value::Bytes(br#"{"a":1}"#.to_vec()), &json_col),
            json!({"a": 1})
        );

        let text = column(ColumnType::MYSQL_TYPE_VAR_STRING, 255);
        assert_eq!(from_mysql_value(Value::Bytes(b"123".to_vec()), &text), json!("123"));

        let decimal = column(ColumnType::MYSQL_TYPE_NEWDECIMAL, 10);
        assert_eq!(from_mysql_value(Value::Bytes(b"12.50".to_vec()), &decimal), json!("12.50"));

        let blob = ColumnMeta {
            binary: true,
            ..column(ColumnType::MYSQL_TYPE_BLOB, 65535)
        };
        assert_eq!(from_mysql_value(Value::Bytes(b"Hello".to_vec()), &blob), json!("SGVsbG8="));
    }

    #[test]
    fn test_dates() {
        let date = column(ColumnType::MYSQL_TYPE_DATE, 10);
        assert_eq!(
            from_mysql_value(Value::Date(2024, 5, 1, 0, 0, 0, 0), &date),
            json!("2024-05-01")
        );

        let datetime = column(ColumnType::MYSQL_TYPE_DATETIME, 26);
        assert_eq!(
            from_mysql_value(Value::Date(2024, 5, 1, 10, 20, 30, 500), &datetime),
            json!("2024-05-01T10:20:30.000500")
        );

        let time = column(ColumnType::MYSQL_TYPE_TIME, 10);
        assert_eq!(
            from_mysql_value(Value::Time(true, 1, 2, 3, 4, 0), &time),
            json!("-26:03:04")
        );
    }
}

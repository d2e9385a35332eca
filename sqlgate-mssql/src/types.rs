//! Type conversions for Microsoft SQL Server.

use std::borrow::Cow;

use serde_json::Value;
use tiberius::{ColumnData, ToSql};

/// A bind value for an `@Pn` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum MssqlParam {
    /// SQL NULL.
    Null,
    /// BIT.
    Bool(bool),
    /// BIGINT.
    Int(i64),
    /// FLOAT.
    Float(f64),
    /// NVARCHAR.
    Text(String),
}

impl From<&Value> for MssqlParam {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl ToSql for MssqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            Self::Null => ColumnData::String(None),
            Self::Bool(b) => ColumnData::Bit(Some(*b)),
            Self::Int(i) => ColumnData::I64(Some(*i)),
            Self::Float(f) => ColumnData::F64(Some(*f)),
            Self::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
        }
    }
}

/// Convert JSON values to SQL Server parameters, in placeholder order.
pub fn json_values_to_params(values: &[Value]) -> Vec<MssqlParam> {
    values.iter().map(MssqlParam::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_params_keep_order() {
        let params = json_values_to_params(&[json!(10), json!("x")]);
        assert_eq!(params, vec![MssqlParam::Int(10), MssqlParam::Text("x".into())]);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(MssqlParam::from(&Value::Null), MssqlParam::Null);
        assert_eq!(MssqlParam::from(&json!(false)), MssqlParam::Bool(false));
        assert_eq!(MssqlParam::from(&json!(1.5)), MssqlParam::Float(1.5));
        assert_eq!(
            MssqlParam::from(&json!({"a": 1})),
            MssqlParam::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_to_sql() {
        assert!(matches!(MssqlParam::Null.to_sql(), ColumnData::String(None)));
        assert!(matches!(MssqlParam::Bool(true).to_sql(), ColumnData::Bit(Some(true))));
        assert!(matches!(MssqlParam::Int(7).to_sql(), ColumnData::I64(Some(7))));
        match MssqlParam::Text("abc".into()).to_sql() {
            ColumnData::String(Some(s)) => assert_eq!(s, "abc"),
            other => panic!("unexpected column data: {other:?}"),
        }
    }
}

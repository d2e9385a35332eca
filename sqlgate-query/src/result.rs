//! Normalized query results.

use serde::Serialize;
use serde_json::{Map, Value};

/// One result row: column name to value, in column order.
pub type Row = Map<String, Value>;

/// A result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name as reported by the engine.
    pub id: String,
}

impl Column {
    /// Create a column.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Engine-independent result of a single statement.
///
/// `count` always equals the number of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    count: usize,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Build a result from columns and rows.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            count: rows.len(),
            columns,
            rows,
        }
    }

    /// Number of rows.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Columns in engine order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows in engine order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Split into columns and rows.
    pub fn into_parts(self) -> (Vec<Column>, Vec<Row>) {
        (self.columns, self.rows)
    }
}

/// Build a row from column names and values in matching order.
pub fn zip_row<I>(columns: &[Column], values: I) -> Row
where
    I: IntoIterator<Item = Value>,
{
    columns
        .iter()
        .map(|column| column.id.clone())
        .zip(values)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_count_matches_rows() {
        let columns = vec![Column::new("id"), Column::new("name")];
        let rows = vec![
            zip_row(&columns, [json!(1), json!("a")]),
            zip_row(&columns, [json!(2), json!("b")]),
        ];
        let result = QueryResult::new(columns, rows);
        assert_eq!(result.count(), 2);
        assert_eq!(result.rows().len(), result.count());
    }

    #[test]
    fn test_json_shape() {
        let columns = vec![Column::new("z"), Column::new("a")];
        let rows = vec![zip_row(&columns, [json!(true), Value::Null])];
        let result = QueryResult::new(columns, rows);

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"count":1,"columns":[{"id":"z"},{"id":"a"}],"rows":[{"z":true,"a":null}]}"#
        );
    }
}

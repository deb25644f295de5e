//! Uniform result shape shared by the dispatcher, the chart renderers and the
//! table renderer. Rows are untyped records; column meaning is positional and
//! follows the order of `fields`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::QueryId;

pub type Row = Map<String, Value>;

/// Output of one backend procedure call, before it is tagged with a query id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub fields: Vec<String>,
    #[serde(alias = "rowData")]
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(fields: Vec<String>, rows: Vec<Row>) -> Self { Self { fields, rows } }

    pub fn into_result(self, id: QueryId) -> QueryResult {
        QueryResult { id, fields: self.fields, rows: self.rows }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: QueryId,
    pub fields: Vec<String>,
    #[serde(alias = "rowData")]
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool { self.fields.is_empty() || self.rows.is_empty() }

    /// Cell of `row` at field position `pos`, if the field exists and the row has it.
    pub fn cell<'a>(&self, row: &'a Row, pos: usize) -> Option<&'a Value> {
        let name = self.fields.get(pos)?;
        row.get(name)
    }
}

/// Render a cell the way the table and chart labels show it.
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::from("NULL"),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric reading of a cell. Strings are accepted with thousands separators
/// ("1,234.5"), matching how the database formats some aggregates.
pub fn cell_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            let t = cleaned.trim();
            if t.is_empty() { return None; }
            t.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Build a row from (field, value) pairs. Handy for fixtures and tests.
pub fn row_from_pairs<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_number_accepts_separators_and_numbers() {
        assert_eq!(cell_number(&json!("1,234.5")), Some(1234.5));
        assert_eq!(cell_number(&json!(42)), Some(42.0));
        assert_eq!(cell_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(cell_number(&json!("n/a")), None);
        assert_eq!(cell_number(&json!("")), None);
        assert_eq!(cell_number(&Value::Null), None);
    }

    #[test]
    fn cell_is_positional() {
        let id = QueryId::new(9).unwrap();
        let row = row_from_pairs([("category", json!("Daylight")), ("avg_kwh", json!("12.5"))]);
        let res = QueryResult { id, fields: vec!["category".into(), "avg_kwh".into()], rows: vec![row.clone()] };
        assert_eq!(res.cell(&row, 1), Some(&json!("12.5")));
        assert_eq!(res.cell(&row, 2), None);
    }

    #[test]
    fn deserializes_row_data_key() {
        let v = json!({"id": 3, "fields": ["a"], "rowData": [{"a": 1}]});
        let res: QueryResult = serde_json::from_value(v).unwrap();
        assert_eq!(res.rows.len(), 1);
        assert_eq!(res.id.get(), 3);
    }
}

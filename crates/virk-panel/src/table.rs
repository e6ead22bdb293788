//! Row buffer turned into a typed `DataFrame`.

use crate::error::Result;
use crate::schema::ColumnKind;
use polars::prelude::*;
use serde_json::Value;

/// Accumulates rows of JSON values against a fixed column list.
///
/// Each column is typed from the values it ends up holding: booleans,
/// 64-bit integers, floats, or strings. Columns mixing kinds, and any array
/// or object value, become strings holding the JSON text. All-null columns
/// are typed as strings.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    /// Creates a builder for the given columns
    pub fn new<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names, in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Append a row. Missing trailing values are null, extra values are
    /// dropped.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Number of rows pushed so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row has been pushed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the table.
    pub fn build(self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for (position, name) in self.columns.iter().enumerate() {
            let values = self.rows.iter().map(|row| &row[position]);
            columns.push(typed_column(name, values)?);
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn typed_column<'a>(
    name: &str,
    values: impl Iterator<Item = &'a Value> + Clone,
) -> Result<Column> {
    let name: PlSmallStr = name.into();
    let column = match ColumnKind::infer(values.clone()) {
        ColumnKind::Bool => Column::new(name, values.map(Value::as_bool).collect::<Vec<_>>()),
        ColumnKind::Int => Column::new(name, values.map(Value::as_i64).collect::<Vec<_>>()),
        ColumnKind::Float => Column::new(name, values.map(Value::as_f64).collect::<Vec<_>>()),
        ColumnKind::Null | ColumnKind::Text => {
            let text = values.map(value_to_text).collect::<Result<Vec<_>>>()?;
            Column::new(name, text)
        }
    };
    Ok(column)
}

/// Text form of a value: strings verbatim, other values as compact JSON,
/// `null` as a missing value.
pub fn value_to_text(value: &Value) -> Result<Option<String>> {
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(serde_json::to_string(other)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_types_are_inferred() {
        let mut builder = TableBuilder::new(["id", "score", "name", "flag", "mixed", "nothing"]);
        builder.push_row(vec![json!(1), json!(1.5), json!("a"), json!(true), json!(1), json!(null)]);
        builder.push_row(vec![json!(2), json!(2), json!(null), json!(false), json!("b")]);
        let df = builder.build().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("name").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("nothing").unwrap().null_count(), 2);

        let mixed = df.column("mixed").unwrap().str().unwrap();
        assert_eq!(mixed.get(0), Some("1"));
        assert_eq!(mixed.get(1), Some("b"));
    }

    #[test]
    fn test_nested_values_become_json_text() {
        let mut builder = TableBuilder::new(["list"]);
        builder.push_row(vec![json!([{"navn": "A"}])]);
        let df = builder.build().unwrap();

        let list = df.column("list").unwrap().str().unwrap();
        assert_eq!(list.get(0), Some(r#"[{"navn":"A"}]"#));
    }

    #[test]
    fn test_empty_builder_keeps_columns() {
        let df = TableBuilder::new(["a", "b"]).build().unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }
}

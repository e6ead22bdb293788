//! Single wide table: every flattened path of every hit as a column.
//!
//! Lists are kept as their JSON text, so temporal history survives only as
//! an opaque string. Use the panel tables when the history matters.

use crate::error::Result;
use crate::flatten::FlatRecord;
use crate::normalize::flatten_hit;
use crate::schema::BatchSchema;
use crate::table::TableBuilder;
use polars::prelude::DataFrame;
use serde_json::Value;
use tracing::info;

/// Wide table of already flattened records; column set is the union over
/// the batch in first-seen order.
pub fn wide_table_from_records(records: &[FlatRecord]) -> Result<DataFrame> {
    let schema = BatchSchema::scan(records);
    let lists = schema.list_columns().len();
    let columns: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();

    let mut builder = TableBuilder::new(&columns);
    for record in records {
        builder.push_row(
            columns
                .iter()
                .map(|c| record.get(*c).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }
    let table = builder.build()?;

    info!(
        records = records.len(),
        columns = table.width(),
        list_columns = lists,
        "flattened to wide table"
    );
    Ok(table)
}

/// Wide table of raw hits: metadata columns first, then `_source` paths.
pub fn wide_table(hits: &[Value]) -> Result<DataFrame> {
    let records: Vec<FlatRecord> = hits.iter().map(flatten_hit).collect();
    wide_table_from_records(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lists_become_json_text() {
        let hits = vec![json!({
            "_id": "1",
            "_source": {"Vrvirksomhed": {"cvrNummer": 1, "navne": [{"navn": "A"}]}}
        })];
        let df = wide_table(&hits).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["_id", "Vrvirksomhed_cvrNummer", "Vrvirksomhed_navne"]);
        let navne = df.column("Vrvirksomhed_navne").unwrap().str().unwrap();
        assert_eq!(navne.get(0), Some(r#"[{"navn":"A"}]"#));
    }

    #[test]
    fn test_union_of_columns() {
        let hits = vec![
            json!({"_source": {"a": 1}}),
            json!({"_source": {"b": {"c": "x"}}}),
        ];
        let df = wide_table(&hits).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("a").unwrap().null_count(), 1);
        assert_eq!(df.column("b_c").unwrap().null_count(), 1);
    }
}

//! Integration tests for dataset writing

use polars::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use virk_output::{DatasetWriter, ReportBuilder, RunReport, company_base, read_table};

fn table() -> DataFrame {
    df! {
        "cvrNummer" => [11111111i64, 22222222],
        "navn" => [Some("A ApS"), None]
    }
    .unwrap()
}

#[test]
fn test_panel_file_names() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::create(dir.path().join("out")).unwrap();
    let main = table();
    let navne = table();

    let base = company_base(Some(2023));
    let files = writer
        .write_panel(&base, [("main", &main), ("navne", &navne)])
        .unwrap();

    assert_eq!(files.len(), 2);
    assert!(dir.path().join("out/virksomhed_2023_main.parquet").exists());
    assert!(dir.path().join("out/virksomhed_2023_navne.parquet").exists());
    assert_eq!(files[1].dataset, "navne");
    assert_eq!(files[1].rows, 2);
}

#[test]
fn test_parquet_round_trip_keeps_nulls() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::create(dir.path()).unwrap();
    let file = writer.write_wide("virksomhed", &table()).unwrap();

    assert_eq!(file.path, dir.path().join("virksomhed_wide.parquet"));
    let back = read_table(&file.path).unwrap();
    assert!(back.equals_missing(&table()));
}

#[test]
fn test_raw_records_written_verbatim() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::create(dir.path()).unwrap();
    let records = vec![
        json!({"_id": "1", "_source": {"Vrvirksomhed": {"navne": [{"navn": "Ø"}]}}}),
        json!({"_id": "2", "_source": {}}),
    ];

    let file = writer.write_raw("virksomhed", &records).unwrap();

    assert_eq!(file.rows, 2);
    let text = std::fs::read_to_string(dir.path().join("virksomhed_raw.json")).unwrap();
    let back: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
    assert_eq!(back, records);
}

#[test]
fn test_report_written_next_to_data() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::create(dir.path()).unwrap();
    let file = writer.write_table("financial_statements", "financial_statements", &table()).unwrap();

    let report = ReportBuilder::new()
        .dataset("financial_statements")
        .records(2)
        .files([&file])
        .build()
        .unwrap();
    let path = dir.path().join("financial_statements_report.json");
    report.write_to(&path).unwrap();

    let back: RunReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back.tables[0].rows, 2);
    assert_eq!(back.tables[0].columns, 2);
    assert_eq!(back.files, vec![file.path]);
}

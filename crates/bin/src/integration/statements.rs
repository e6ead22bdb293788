//! Financial statements pipeline.

use super::{PipelineError, date_range, failure_of, spinner};
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::error;
use virk::Dataset;
use virk_data::search::{SearchClient, SearchTransport};
use virk_output::{DatasetWriter, ExportFormat, ReportBuilder, RunReport, statements_stem};
use virk_panel::statements_table;

/// Options of one statements run.
#[derive(Debug, Clone)]
pub(crate) struct StatementJob {
    /// Accounting period year, `None` for every publication.
    pub year: Option<i32>,
    /// Wide table as parquet, or the raw publications as JSON.
    pub format: ExportFormat,
    /// Output folder.
    pub output_dir: PathBuf,
}

/// Fetch published statements and write them.
pub(crate) async fn fetch_statements<T: SearchTransport>(
    client: &SearchClient<T>,
    job: &StatementJob,
) -> Result<RunReport, PipelineError> {
    let range = date_range(job.year)?;
    let pb = spinner("Searching financial statements...")?;
    let outcome = client.statements(range, Some(&pb)).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    let failure = failure_of(&outcome);
    if let Some(reason) = &failure {
        error!(
            records = outcome.hits.len(),
            %reason,
            "statement retrieval stopped early, writing partial results"
        );
    }
    write_statements(&outcome.hits, job, failure)
}

/// Write publications as the statements table or as raw JSON.
pub(crate) fn write_statements(
    hits: &[Value],
    job: &StatementJob,
    failure: Option<String>,
) -> Result<RunReport, PipelineError> {
    let writer = DatasetWriter::create(&job.output_dir)?;
    let stem = statements_stem(job.year);
    let dataset = Dataset::Statements.name();

    let file = match job.format {
        ExportFormat::Json => writer.write_records(&stem, dataset, hits)?,
        ExportFormat::Parquet => writer.write_table(&stem, dataset, &statements_table(hits)?)?,
    };

    let report = ReportBuilder::new()
        .dataset(dataset)
        .year(job.year)
        .records(hits.len())
        .failure(failure)
        .files([&file])
        .details(json!({ "format": job.format.extension() }))
        .build()?;
    report.write_to(&writer.dir().join(format!("{stem}_report.json")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::testing::{PagedTransport, client};

    fn publication(id: &str, cvr: i64) -> Value {
        json!({
            "_id": id,
            "_source": {
                "cvrNummer": cvr,
                "regnskab": {"regnskabsperiode": {"startDato": "2022-01-01", "slutDato": "2022-12-31"}},
                "dokumenter": [{
                    "dokumentType": "AARSRAPPORT",
                    "dokumentMimeType": "application/xml",
                    "dokumentUrl": format!("http://docs.test/{id}.xml")
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_statements_over_two_pages() {
        let dir = tempfile::tempdir().unwrap();
        let transport = PagedTransport::new(
            vec![vec![publication("a", 1), publication("b", 2)], vec![publication("c", 3)]],
            false,
        );
        let job = StatementJob {
            year: Some(2022),
            format: ExportFormat::Parquet,
            output_dir: dir.path().to_path_buf(),
        };

        let report = fetch_statements(&client(transport), &job).await.unwrap();

        assert!(report.complete);
        assert_eq!(report.records, 3);
        let table = virk_output::read_table(&dir.path().join("financial_statements_2022.parquet")).unwrap();
        assert_eq!(table.height(), 3);
        assert!(table.column("AARSRAPPORT_xml").is_ok());
        assert!(dir.path().join("financial_statements_2022_report.json").exists());
    }

    #[test]
    fn test_raw_statements() {
        let dir = tempfile::tempdir().unwrap();
        let job = StatementJob {
            year: None,
            format: ExportFormat::Json,
            output_dir: dir.path().to_path_buf(),
        };

        write_statements(&[publication("a", 1)], &job, None).unwrap();

        let text = std::fs::read_to_string(dir.path().join("financial_statements.json")).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![publication("a", 1)]);
    }
}

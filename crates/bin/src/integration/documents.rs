//! Statement details pipeline: XBRL facts of annual reports, one table per year.

use super::{PipelineError, progress_bar};
use polars::prelude::DataFrame;
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};
use virk::Dataset;
use virk_data::search::YearRange;
use virk_data::xbrl::{DocumentSource, XbrlBatchTransformer, document_urls_for_year};
use virk_output::{
    DatasetWriter, ExportFormat, ReportBuilder, RunReport, read_table, statement_details_stem,
    statements_stem,
};

/// Options of one statement details run.
#[derive(Debug, Clone)]
pub(crate) struct DocumentJob {
    /// Years to process, each on its own.
    pub years: YearRange,
    /// Documents fetched concurrently per batch.
    pub batch_size: usize,
    /// Folder holding `financial_statements.parquet`.
    pub input_dir: PathBuf,
    /// Output folder.
    pub output_dir: PathBuf,
}

/// Process every year of the job, one report per year that completed.
///
/// A failing year is logged and the next year proceeds.
pub(crate) async fn transform_documents<S: DocumentSource>(
    source: S,
    job: &DocumentJob,
) -> Result<Vec<RunReport>, PipelineError> {
    let input = job
        .input_dir
        .join(format!("{}.{}", statements_stem(None), ExportFormat::Parquet.extension()));
    info!(path = %input.display(), "reading financial statements");
    let statements = read_table(&input)?;

    let transformer = XbrlBatchTransformer::new(source, job.batch_size);
    let writer = DatasetWriter::create(&job.output_dir)?;
    let mut reports = Vec::new();

    for year in job.years.years() {
        match transform_year(&transformer, &statements, year, &writer).await {
            Ok(report) => reports.push(report),
            Err(e) => error!(year, error = %e, "failed to process year"),
        }
    }
    Ok(reports)
}

async fn transform_year<S: DocumentSource>(
    transformer: &XbrlBatchTransformer<S>,
    statements: &DataFrame,
    year: i32,
    writer: &DatasetWriter,
) -> Result<RunReport, PipelineError> {
    let urls = document_urls_for_year(statements, year)?;
    info!(year, documents = urls.len(), "selected annual reports");

    let pb = progress_bar(urls.len() as u64, format!("Parsing {year} annual reports..."))?;
    let outcome = transformer.transform_year(&urls, year, Some(&pb)).await;
    pb.finish_and_clear();
    let transform = outcome?;

    let stem = statement_details_stem(year);
    let dataset = Dataset::StatementDetails.name();
    let files = match &transform.table {
        Some(table) => vec![writer.write_table(&stem, dataset, table)?],
        None => {
            warn!(year, "no table written");
            Vec::new()
        }
    };

    let report = ReportBuilder::new()
        .dataset(dataset)
        .year(Some(year))
        .records(transform.documents)
        .files(&files)
        .details(json!({
            "parsed": transform.parsed,
            "failed": transform.failed,
            "facts": transform.facts,
            "batch_size": transformer.batch_size(),
        }))
        .build()?;
    report.write_to(&writer.dir().join(format!("{stem}_report.json")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::collections::HashMap;
    use virk_data::DataError;

    fn instance(cvr: &str, end: &str, revenue: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance" xmlns:fsa="http://xbrl.dcca.dk/fsa">
  <xbrli:context id="d">
    <xbrli:entity><xbrli:identifier scheme="http://www.dcca.dk/cvr">{cvr}</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:startDate>2022-01-01</xbrli:startDate><xbrli:endDate>{end}</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <fsa:Revenue contextRef="d" unitRef="DKK" decimals="0">{revenue}</fsa:Revenue>
</xbrli:xbrl>"#
        )
    }

    struct MemorySource(HashMap<String, String>);

    impl DocumentSource for MemorySource {
        async fn fetch(&self, url: &str) -> virk_data::Result<Vec<u8>> {
            self.0
                .get(url)
                .map(|doc| doc.clone().into_bytes())
                .ok_or_else(|| DataError::Http(format!("{url} returned status 404 Not Found")))
        }
    }

    fn write_statements(dir: &std::path::Path) {
        let table = df!(
            "AARSRAPPORT_xml" => [Some("http://docs.test/a.xml"), Some("http://docs.test/b.xml"), Some("http://docs.test/missing.xml"), None],
            "regnskab_regnskabsperiode_slutDato" => ["2022-12-31", "2022-06-30", "2022-12-31", "2022-12-31"]
        )
        .unwrap();
        DatasetWriter::create(dir)
            .unwrap()
            .write_table("financial_statements", "financial_statements", &table)
            .unwrap();
    }

    #[tokio::test]
    async fn test_years_are_processed_independently() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_statements(input.path());
        let source = MemorySource(HashMap::from([
            ("http://docs.test/a.xml".to_string(), instance("11111111", "2022-12-31", "100")),
            ("http://docs.test/b.xml".to_string(), instance("22222222", "2022-06-30", "7")),
        ]));
        let job = DocumentJob {
            years: YearRange::new(2021, Some(2022)).unwrap(),
            batch_size: 2,
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
        };

        let reports = transform_documents(source, &job).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].files.is_empty());
        assert!(!output.path().join("companies_all_tags_2021.parquet").exists());

        let details = &reports[1];
        assert_eq!(details.records, 3);
        assert_eq!(details.details["failed"], 1);
        let table = read_table(&output.path().join("companies_all_tags_2022.parquet")).unwrap();
        assert_eq!(table.height(), 2);
        assert!(table.column("Year").is_ok());
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = DocumentJob {
            years: YearRange::new(2022, None).unwrap(),
            batch_size: 10,
            input_dir: dir.path().to_path_buf(),
            output_dir: dir.path().to_path_buf(),
        };
        let source = MemorySource(HashMap::new());

        assert!(matches!(
            transform_documents(source, &job).await,
            Err(PipelineError::Export(_))
        ));
    }
}

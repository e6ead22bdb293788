//! Company dataset pipeline.

use super::{PipelineError, date_range, failure_of, spinner};
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::{error, info, warn};
use virk::{Dataset, OutputMode};
use virk_data::search::{SearchClient, SearchTransport};
use virk_output::{DatasetWriter, ExportFormat, ReportBuilder, RunReport, company_base};
use virk_panel::{COMPANY, PanelAssembler, translate_frame, wide_table};

/// Options of one company run.
#[derive(Debug, Clone)]
pub(crate) struct CompanyJob {
    /// Last-updated year filter, `None` for every company.
    pub year: Option<i32>,
    /// Tables as parquet, or the raw records as JSON.
    pub format: ExportFormat,
    /// Panel or wide tables.
    pub mode: OutputMode,
    /// Rename columns and codes to English.
    pub translate: bool,
    /// Output folder.
    pub output_dir: PathBuf,
}

/// Fetch company records and write them.
///
/// A session that stops after the first page still writes what it gathered.
pub(crate) async fn fetch_companies<T: SearchTransport>(
    client: &SearchClient<T>,
    job: &CompanyJob,
) -> Result<RunReport, PipelineError> {
    let range = date_range(job.year)?;
    let pb = spinner("Searching company records...")?;
    let outcome = client.companies(range, Some(&pb)).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    let failure = failure_of(&outcome);
    if let Some(reason) = &failure {
        error!(
            records = outcome.hits.len(),
            %reason,
            "company retrieval stopped early, writing partial results"
        );
    }
    write_companies(&outcome.hits, job, failure)
}

/// Turn company hits into the requested tables and write them.
pub(crate) fn write_companies(
    hits: &[Value],
    job: &CompanyJob,
    failure: Option<String>,
) -> Result<RunReport, PipelineError> {
    let writer = DatasetWriter::create(&job.output_dir)?;
    let base = company_base(job.year);

    let files = match (job.format, job.mode) {
        (ExportFormat::Json, _) => {
            if job.translate {
                warn!("raw records are written untranslated");
            }
            vec![writer.write_raw(&base, hits)?]
        }
        (ExportFormat::Parquet, OutputMode::Panel) => {
            let mut panel = PanelAssembler::new(COMPANY).assemble(hits)?;
            info!(
                tables = panel.len(),
                rows = panel.total_rows(),
                "assembled company panel"
            );
            if job.translate {
                for (_, table) in panel.tables_mut() {
                    translate_frame(table)?;
                }
            }
            writer.write_panel(&base, panel.iter())?
        }
        (ExportFormat::Parquet, OutputMode::Wide) => {
            let mut table = wide_table(hits)?;
            if job.translate {
                translate_frame(&mut table)?;
            }
            vec![writer.write_wide(&base, &table)?]
        }
    };

    let report = ReportBuilder::new()
        .dataset(Dataset::Companies.name())
        .year(job.year)
        .records(hits.len())
        .failure(failure)
        .files(&files)
        .details(json!({
            "mode": job.mode.name(),
            "format": job.format.extension(),
            "translated": job.translate,
        }))
        .build()?;
    report.write_to(&writer.dir().join(format!("{base}_report.json")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::testing::{PagedTransport, client};
    use rstest::rstest;

    fn company(cvr: i64, streets: &[&str]) -> Value {
        let addresses: Vec<Value> = streets
            .iter()
            .map(|s| json!({"vejnavn": s, "periode": {"gyldigFra": "2010-01-01", "gyldigTil": null}}))
            .collect();
        json!({
            "_id": cvr.to_string(),
            "_source": {"Vrvirksomhed": {
                "cvrNummer": cvr,
                "enhedsNummer": cvr + 1,
                "beliggenhedsadresse": addresses,
                "virksomhedsstatus": [{"status": "NORMAL", "periode": {"gyldigFra": "2010-01-01"}}]
            }}
        })
    }

    fn job(dir: &std::path::Path, format: ExportFormat, mode: OutputMode) -> CompanyJob {
        CompanyJob {
            year: None,
            format,
            mode,
            translate: false,
            output_dir: dir.to_path_buf(),
        }
    }

    #[rstest]
    #[case(ExportFormat::Parquet, OutputMode::Wide, "virksomhed_wide.parquet")]
    #[case(ExportFormat::Json, OutputMode::Panel, "virksomhed_raw.json")]
    #[case(ExportFormat::Parquet, OutputMode::Panel, "virksomhed_beliggenhedsadresse.parquet")]
    fn test_output_files(#[case] format: ExportFormat, #[case] mode: OutputMode, #[case] file: &str) {
        let dir = tempfile::tempdir().unwrap();
        let hits = vec![company(11111111, &["Vej A", "Vej B"]), company(22222222, &[])];

        let report = write_companies(&hits, &job(dir.path(), format, mode), None).unwrap();

        assert!(dir.path().join(file).exists());
        assert!(dir.path().join("virksomhed_report.json").exists());
        assert_eq!(report.records, 2);
        assert!(report.complete);
    }

    #[test]
    fn test_translated_panel() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path(), ExportFormat::Parquet, OutputMode::Panel);
        job.translate = true;

        let report = write_companies(&[company(11111111, &["Vej A"])], &job, None).unwrap();

        let status = report
            .tables
            .iter()
            .find(|t| t.name == "virksomhedsstatus")
            .unwrap();
        assert_eq!(status.rows, 1);
        let table = virk_output::read_table(&dir.path().join("virksomhed_virksomhedsstatus.parquet")).unwrap();
        assert!(table.column("cvr_number").is_ok());
        assert!(table.column("cvrNummer").is_err());
    }

    #[tokio::test]
    async fn test_partial_retrieval_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let transport = PagedTransport::new(
            vec![vec![company(11111111, &["Vej A"])], vec![company(22222222, &[])]],
            true,
        );
        let client = client(transport);

        let report = fetch_companies(&client, &job(dir.path(), ExportFormat::Parquet, OutputMode::Panel))
            .await
            .unwrap();

        assert!(!report.complete);
        assert_eq!(report.records, 2);
        assert!(dir.path().join("virksomhed_main.parquet").exists());
    }
}

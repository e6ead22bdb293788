//! Pipelines behind the CLI subcommands.
//!
//! Each pipeline fetches one dataset, turns it into tables and writes them
//! together with a `<base>_report.json` run report.

pub(crate) mod companies;
pub(crate) mod documents;
pub(crate) mod folders;
pub(crate) mod statements;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use virk_data::search::{DateRange, ScrollOutcome, ScrollStatus};

/// Error type for pipeline runs.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Retrieval or XBRL processing error.
    #[error("Data error: {0}")]
    Data(#[from] virk_data::DataError),

    /// Table building error.
    #[error("Panel error: {0}")]
    Panel(#[from] virk_panel::PanelError),

    /// Output writing error.
    #[error("Export error: {0}")]
    Export(#[from] virk_output::ExportError),

    /// Run report error.
    #[error("Report error: {0}")]
    Report(#[from] virk_output::ReportError),

    /// Progress bar template error.
    #[error("Progress template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    /// Year outside the calendar range.
    #[error("Invalid year: {0}")]
    InvalidYear(i32),
}

/// Date filter for an optional year.
pub(crate) fn date_range(year: Option<i32>) -> Result<Option<DateRange>, PipelineError> {
    year.map(|y| DateRange::year(y).ok_or(PipelineError::InvalidYear(y)))
        .transpose()
}

/// Failure reason of a scroll session that stopped early.
pub(crate) fn failure_of(outcome: &ScrollOutcome) -> Option<String> {
    match &outcome.status {
        ScrollStatus::Exhausted => None,
        ScrollStatus::Failed(reason) => Some(reason.clone()),
    }
}

/// Spinner for work of unknown length.
pub(crate) fn spinner(message: &'static str) -> Result<ProgressBar, PipelineError> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

/// Bar for work of known length.
pub(crate) fn progress_bar(len: u64, message: String) -> Result<ProgressBar, PipelineError> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range() {
        assert!(date_range(None).unwrap().is_none());
        let range = date_range(Some(2023)).unwrap().unwrap();
        assert_eq!(range.start.to_string(), "2023-01-01");
        assert_eq!(range.end.to_string(), "2023-12-31");
        assert!(matches!(
            date_range(Some(i32::MAX)),
            Err(PipelineError::InvalidYear(_))
        ));
    }

    #[test]
    fn test_failure_of() {
        let mut outcome = ScrollOutcome {
            hits: Vec::new(),
            status: ScrollStatus::Exhausted,
            total: None,
            pages: 0,
        };
        assert_eq!(failure_of(&outcome), None);
        outcome.status = ScrollStatus::Failed("timeout".to_string());
        assert_eq!(failure_of(&outcome).as_deref(), Some("timeout"));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory search transport for pipeline tests.

    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use virk_data::search::{SearchClient, SearchTransport, TransportResponse};
    use virk_data::{Credentials, DataError, VirkConfig};

    /// Serves scripted pages, then a transport failure or an empty page.
    pub(crate) struct PagedTransport {
        pages: Mutex<VecDeque<Vec<Value>>>,
        fail_when_drained: bool,
    }

    impl PagedTransport {
        pub(crate) fn new(pages: Vec<Vec<Value>>, fail_when_drained: bool) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                fail_when_drained,
            }
        }
    }

    impl SearchTransport for PagedTransport {
        async fn post(&self, _url: &str, _body: &Value) -> virk_data::Result<TransportResponse> {
            let next = self.pages.lock().unwrap().pop_front();
            match next {
                Some(hits) => Ok(TransportResponse::new(
                    200,
                    json!({"_scroll_id": "cursor", "hits": {"hits": hits}}).to_string(),
                )),
                None if self.fail_when_drained => Err(DataError::Transport("read timed out".to_string())),
                None => Ok(TransportResponse::new(
                    200,
                    json!({"_scroll_id": "cursor", "hits": {"hits": []}}).to_string(),
                )),
            }
        }

        async fn delete(&self, _url: &str, _body: &Value) -> virk_data::Result<TransportResponse> {
            Ok(TransportResponse::new(200, "{}"))
        }
    }

    pub(crate) fn client(transport: PagedTransport) -> SearchClient<PagedTransport> {
        let mut config = VirkConfig::new(Credentials::new("user", "secret"));
        config.company_scroll.max_attempts = 1;
        config.statement_scroll.max_attempts = 1;
        SearchClient::new(transport, config)
    }
}

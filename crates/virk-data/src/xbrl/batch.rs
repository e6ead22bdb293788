//! Batched download and pivot of XBRL documents for one year.

use super::parser::XbrlDocument;
use super::pivot::WidePivot;
use crate::config::HttpConfig;
use crate::error::{DataError, Result};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use polars::prelude::DataFrame;
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Default number of documents per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Fetches raw documents by URL.
pub trait DocumentSource: Send + Sync {
    /// Download the document at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Document source over plain HTTP GET.
pub struct DocumentClient {
    client: reqwest::Client,
}

impl DocumentClient {
    /// Create a client with the configured document timeout.
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.as_str())
            .connect_timeout(http.connect_timeout)
            .timeout(http.document_timeout)
            .build()
            .map_err(DataError::Network)?;
        Ok(Self { client })
    }
}

impl fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClient").finish_non_exhaustive()
    }
}

impl DocumentSource for DocumentClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::Http(format!(
                "{url} returned status {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Counters and wide table for one processed year.
#[derive(Debug)]
pub struct YearTransform {
    /// Target year
    pub year: i32,
    /// URLs offered
    pub documents: usize,
    /// Documents fetched and parsed
    pub parsed: usize,
    /// Documents skipped after a fetch or parse failure
    pub failed: usize,
    /// Facts kept after the year filter
    pub facts: usize,
    /// Wide table, `None` when no fact survived
    pub table: Option<DataFrame>,
}

/// Downloads document batches concurrently and pivots them to one wide
/// table.
#[derive(Debug)]
pub struct XbrlBatchTransformer<S> {
    source: S,
    batch_size: usize,
}

impl<S: DocumentSource> XbrlBatchTransformer<S> {
    /// Create a transformer fetching up to `batch_size` documents at once.
    pub fn new(source: S, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// The document source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Configured batch size.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetch, parse, filter and pivot every document in `urls` for `year`.
    ///
    /// Batches run one after another; inside a batch every download runs
    /// concurrently and the batch ends only when all of them have resolved.
    /// A failed download or parse is logged and contributes no rows.
    pub async fn transform_year(
        &self,
        urls: &[String],
        year: i32,
        progress: Option<&ProgressBar>,
    ) -> Result<YearTransform> {
        let batches = urls.len().div_ceil(self.batch_size);
        let mut pivot = WidePivot::new();
        let mut parsed = 0;
        let mut failed = 0;
        let mut facts = 0;

        if let Some(pb) = progress {
            pb.set_length(urls.len() as u64);
        }

        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            info!(
                year,
                batch = index + 1,
                batches,
                documents = batch.len(),
                "processing document batch"
            );

            let source = &self.source;
            let downloads: Vec<(&String, Result<Vec<u8>>)> = stream::iter(batch)
                .map(|url| async move { (url, source.fetch(url).await) })
                .buffered(self.batch_size)
                .collect()
                .await;

            let mut batch_facts = 0;
            for (url, download) in downloads {
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                let document = download.and_then(|bytes| XbrlDocument::parse(&bytes));
                match document {
                    Ok(document) => {
                        parsed += 1;
                        let records = document.fact_records();
                        let kept: Vec<_> = records.iter().filter(|r| r.in_year(year)).collect();
                        batch_facts += kept.len();
                        pivot.absorb(kept);
                    }
                    Err(e) => {
                        failed += 1;
                        let warn_failure = || warn!(%url, error = %e, "skipping document");
                        match progress {
                            Some(pb) => pb.suspend(warn_failure),
                            None => warn_failure(),
                        }
                    }
                }
            }

            facts += batch_facts;
            info!(
                year,
                batch = index + 1,
                facts = batch_facts,
                "document batch completed"
            );
        }

        let table = if pivot.is_empty() {
            warn!(year, "no facts found for year after filtering");
            None
        } else {
            info!(
                year,
                entities = pivot.entity_count(),
                tags = pivot.tag_count(),
                "pivoted facts to wide format"
            );
            Some(pivot.into_frame(year)?)
        };

        Ok(YearTransform {
            year,
            documents: urls.len(),
            parsed,
            failed,
            facts,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_is_at_least_one() {
        let transformer = XbrlBatchTransformer::new(
            DocumentClient::new(&HttpConfig::default()).unwrap(),
            0,
        );
        assert_eq!(transformer.batch_size(), 1);
    }
}

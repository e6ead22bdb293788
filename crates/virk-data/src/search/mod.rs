//! Paginated retrieval from the distribution search API.
//!
//! # Example
//!
//! ```no_run
//! use virk_data::config::VirkConfig;
//! use virk_data::search::{DateRange, SearchClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SearchClient::from_config(VirkConfig::from_env()?)?;
//!     let outcome = client.companies(DateRange::year(2023), None).await?;
//!     println!("Retrieved {} company records", outcome.hits.len());
//!     Ok(())
//! }
//! ```

pub mod query;
pub mod scroll;
pub mod transport;

pub use query::{DateRange, MAX_YEAR, MIN_YEAR, SearchRequest, YearRange, company_search, statement_search};
pub use scroll::{ScrollFetcher, ScrollOutcome, ScrollState, ScrollStatus, total_hits};
pub use transport::{HttpTransport, SearchTransport, TransportResponse};

use crate::config::VirkConfig;
use crate::error::Result;
use indicatif::ProgressBar;

/// Search client for the company and statement indices.
#[derive(Debug)]
pub struct SearchClient<T = HttpTransport> {
    transport: T,
    config: VirkConfig,
}

impl SearchClient<HttpTransport> {
    /// Create a client talking HTTP with the configured credentials.
    pub fn from_config(config: VirkConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.credentials.clone(), &config.http)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: SearchTransport> SearchClient<T> {
    /// Create a client over an arbitrary transport.
    pub const fn new(transport: T, config: VirkConfig) -> Self {
        Self { transport, config }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch company records last updated inside `range`, or all of them.
    pub async fn companies(
        &self,
        range: Option<DateRange>,
        progress: Option<&ProgressBar>,
    ) -> Result<ScrollOutcome> {
        let scroll = &self.config.company_scroll;
        let request = company_search(range, scroll.page_size);
        ScrollFetcher::new(&self.transport, &self.config.endpoints.scroll, scroll.clone())
            .fetch_all(&self.config.endpoints.companies, &request, progress)
            .await
    }

    /// Fetch published statements whose accounting period touches `range`.
    pub async fn statements(
        &self,
        range: Option<DateRange>,
        progress: Option<&ProgressBar>,
    ) -> Result<ScrollOutcome> {
        let scroll = &self.config.statement_scroll;
        let request = statement_search(range, scroll.page_size);
        ScrollFetcher::new(&self.transport, &self.config.endpoints.scroll, scroll.clone())
            .fetch_all(&self.config.endpoints.statements, &request, progress)
            .await
    }
}

//! Scroll pagination over the search API.
//!
//! A session walks `Init -> AwaitingFirstPage -> AwaitingNextPage* ->
//! Exhausted | Failed`. Once the server has handed out a cursor, the
//! cursor is released exactly once with the most recent token, whichever
//! way the session ends.

use super::query::{SearchRequest, scroll_continuation, scroll_release};
use super::transport::SearchTransport;
use crate::config::ScrollConfig;
use crate::error::{DataError, Result};
use indicatif::ProgressBar;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle of a scroll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    /// Nothing sent yet
    Init,
    /// Initial search in flight
    AwaitingFirstPage,
    /// Continuation pages in flight
    AwaitingNextPage,
    /// An empty page was received
    Exhausted,
    /// The session was abandoned
    Failed,
}

impl fmt::Display for ScrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::AwaitingFirstPage => "awaiting-first-page",
            Self::AwaitingNextPage => "awaiting-next-page",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a session that acquired a cursor ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollStatus {
    /// Every page was retrieved
    Exhausted,
    /// Retrieval stopped early; the reason is kept for reporting
    Failed(String),
}

/// Hits accumulated by a scroll session.
#[derive(Debug, Clone)]
pub struct ScrollOutcome {
    /// Raw hits in arrival order
    pub hits: Vec<Value>,
    /// Terminal status of the session
    pub status: ScrollStatus,
    /// Total hit count reported by the first page, if any
    pub total: Option<u64>,
    /// Number of non-empty pages received
    pub pages: usize,
}

impl ScrollOutcome {
    /// Whether the result set was retrieved in full.
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, ScrollStatus::Exhausted)
    }
}

/// Total hit count from a search response.
///
/// The API reports `hits.total` either as a number or as `{"value": n}`.
pub fn total_hits(page: &Value) -> Option<u64> {
    let total = page.get("hits")?.get("total")?;
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
}

fn scroll_id(page: &Value) -> Option<String> {
    page.get("_scroll_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn take_hits(page: &mut Value) -> Vec<Value> {
    match page.pointer_mut("/hits/hits").map(Value::take) {
        Some(Value::Array(hits)) => hits,
        _ => Vec::new(),
    }
}

/// Drives one scroll session at a time over a [`SearchTransport`].
pub struct ScrollFetcher<'a, T> {
    transport: &'a T,
    scroll_url: String,
    config: ScrollConfig,
}

impl<T> fmt::Debug for ScrollFetcher<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollFetcher")
            .field("scroll_url", &self.scroll_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, T: SearchTransport> ScrollFetcher<'a, T> {
    /// Create a fetcher using `scroll_url` for continuation and release.
    pub fn new(transport: &'a T, scroll_url: impl Into<String>, config: ScrollConfig) -> Self {
        Self {
            transport,
            scroll_url: scroll_url.into(),
            config,
        }
    }

    /// Retrieve every hit matching `request` from `search_url`.
    ///
    /// # Errors
    ///
    /// Returns an error only when no cursor was acquired: the initial search
    /// failed, answered with a non-success status, or carried no scroll id.
    /// Failures after that point end the session with
    /// [`ScrollStatus::Failed`] and keep the hits gathered so far.
    pub async fn fetch_all(
        &self,
        search_url: &str,
        request: &SearchRequest,
        progress: Option<&ProgressBar>,
    ) -> Result<ScrollOutcome> {
        let mut state = ScrollState::Init;
        let url = format!("{search_url}?scroll={}", self.config.keep_alive);
        let body = serde_json::to_value(request)?;

        self.transition(&mut state, ScrollState::AwaitingFirstPage);
        let response = self.transport.post(&url, &body).await?;
        if !response.is_success() {
            return Err(response.into_api_error());
        }
        let mut page = response.json()?;
        let mut token = scroll_id(&page).ok_or(DataError::MissingScrollId)?;

        let total = total_hits(&page);
        match total {
            Some(total) => info!(total, "search matched records"),
            None => info!("search did not report a total hit count"),
        }

        let mut hits = take_hits(&mut page);
        let mut pages = usize::from(!hits.is_empty());
        report_progress(progress, hits.len());

        let status = self
            .drain(&mut state, &mut token, &mut hits, &mut pages, progress)
            .await;
        self.release(&token).await;

        match &status {
            ScrollStatus::Exhausted => info!(records = hits.len(), pages, "scroll exhausted"),
            ScrollStatus::Failed(reason) => {
                warn!(records = hits.len(), pages, %reason, "scroll stopped early")
            }
        }

        Ok(ScrollOutcome {
            hits,
            status,
            total,
            pages,
        })
    }

    async fn drain(
        &self,
        state: &mut ScrollState,
        token: &mut String,
        hits: &mut Vec<Value>,
        pages: &mut usize,
        progress: Option<&ProgressBar>,
    ) -> ScrollStatus {
        let mut last_page_len = hits.len();

        while last_page_len > 0 {
            self.transition(state, ScrollState::AwaitingNextPage);
            let body = scroll_continuation(&self.config.keep_alive, token);

            let mut page = match self.next_page(&body).await {
                Ok(page) => page,
                Err(e) => {
                    self.transition(state, ScrollState::Failed);
                    return ScrollStatus::Failed(e.to_string());
                }
            };

            let Some(next) = scroll_id(&page) else {
                self.transition(state, ScrollState::Failed);
                return ScrollStatus::Failed(DataError::MissingScrollId.to_string());
            };
            *token = next;

            let page_hits = take_hits(&mut page);
            last_page_len = page_hits.len();
            if last_page_len > 0 {
                *pages += 1;
                hits.extend(page_hits);
                debug!(records = hits.len(), "retrieved page");
                report_progress(progress, hits.len());
            }
        }

        self.transition(state, ScrollState::Exhausted);
        ScrollStatus::Exhausted
    }

    /// Request one continuation page, retrying transport failures with the
    /// same token.
    async fn next_page(&self, body: &Value) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.post(&self.scroll_url, body).await {
                Ok(response) if response.is_success() => return response.json(),
                Ok(response) => return Err(response.into_api_error()),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "scroll request failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn release(&self, token: &str) {
        match self
            .transport
            .delete(&self.scroll_url, &scroll_release(token))
            .await
        {
            Ok(response) if response.is_success() => debug!("scroll context released"),
            Ok(response) => warn!(status = response.status, "scroll release rejected"),
            Err(e) => warn!(error = %e, "scroll release failed"),
        }
    }

    fn transition(&self, state: &mut ScrollState, next: ScrollState) {
        if *state != next {
            debug!(from = %state, to = %next, url = %self.scroll_url, "scroll state");
            *state = next;
        }
    }
}

fn report_progress(progress: Option<&ProgressBar>, records: usize) {
    if let Some(pb) = progress {
        pb.set_message(format!("Retrieved {records} records so far"));
        pb.tick();
    }
}

//! Page fetching.
//!
//! The [`PageFetcher`] trait is the transport boundary of the pipeline: a
//! fetch either yields a page body or `None`. Timeouts, non-success statuses
//! and transport errors are absorbed here and logged; no error type ever
//! crosses the trait. [`HttpFetcher`] is the production implementation with
//! bounded retry and polite request pacing.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub mod pacer;

pub use pacer::Pacer;

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; KeibaStudyBot/1.0; +https://example.com/)";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Transport-level retries per URL.
/// Kept low for a scraping workload: a page that fails twice is recorded as
/// a skip and the run moves on rather than hammering the site.
pub const MAX_RETRIES: u32 = 2;

/// Initial backoff delay between transport retries in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay between transport retries in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 8000;

/// Calculate exponential backoff delay for a retry attempt.
///
/// The exponent is clamped before multiplying: the delay is capped at
/// [`MAX_BACKOFF_MS`] anyway, and an unclamped power overflows for large
/// retry counts.
pub fn calculate_backoff(retry_count: u32) -> Duration {
    const MAX_EXPONENT: u32 = 3;
    let delay_ms = INITIAL_BACKOFF_MS * 2u64.pow(retry_count.min(MAX_EXPONENT));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

/// Fetcher construction errors.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// A successfully retrieved page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    url: String,
    body: String,
}

impl FetchedPage {
    /// Wrap a retrieved body with the URL it came from.
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// URL this page was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw HTML body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Transport boundary of the pipeline.
///
/// `fetch` must apply its own timeout and treat any non-success status or
/// transport failure as `None`; implementations never panic or return errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieve one URL, or `None` on any failure.
    async fn fetch(&self, url: &str) -> Option<FetchedPage>;
}

/// Production fetcher over [`reqwest::Client`].
///
/// Applies [`REQUEST_TIMEOUT`] and [`USER_AGENT`], retries transient
/// failures up to [`MAX_RETRIES`] times with exponential backoff, and pauses
/// via its [`Pacer`] after every request so the overall cadence stays
/// polite even across retries and failures.
pub struct HttpFetcher {
    client: Client,
    pacer: Pacer,
    max_retries: u32,
}

impl HttpFetcher {
    /// Build a fetcher with the default timeout and User-Agent.
    pub fn new(pacer: Pacer) -> Result<Self, FetcherError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetcherError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            pacer,
            max_retries: MAX_RETRIES,
        })
    }

    /// Override the transport retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn request_with_retry(&self, url: &str) -> Option<String> {
        for attempt in 0..=self.max_retries {
            let response = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        error = %e,
                        "Transport error"
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        continue;
                    }
                    return None;
                }
            };

            let status = response.status();

            // 429 and 5xx are worth retrying; other non-success is not
            if status.as_u16() == 429 || status.is_server_error() {
                warn!(url, %status, attempt = attempt + 1, "Retryable status");
                if attempt < self.max_retries {
                    tokio::time::sleep(calculate_backoff(attempt)).await;
                    continue;
                }
                return None;
            }

            if !status.is_success() {
                debug!(url, %status, "Non-success status, giving up");
                return None;
            }

            match response.text().await {
                Ok(body) => return Some(body),
                Err(e) => {
                    debug!(url, error = %e, "Failed to read response body");
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        let body = self.request_with_retry(url).await;
        // Pause after every fetch, successful or not
        self.pacer.pause().await;
        body.map(|b| FetchedPage::new(url, b))
    }
}

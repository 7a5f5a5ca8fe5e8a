//! Page sources and the fetch/pagination machinery built on them.
//!
//! A [`PageSource`] performs exactly one request for one page and classifies
//! the outcome as a [`SourceError`]. It never retries. Retrying is layered on
//! top by [`PageFetcher`], and [`PaginationDriver`] walks the pages one after
//! another until the API reports the end, the page cap is hit, or a fetch
//! fails for good.
//!
//! ```rust,no_run
//! use book_harvester::config::ApiKey;
//! use book_harvester::models::SearchRequest;
//! use book_harvester::sources::{KakaoBookSource, PageFetcher, PaginationDriver};
//! use book_harvester::utils::{HttpClient, LogProgress, RetryConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(Duration::from_secs(10))?;
//! let source = KakaoBookSource::new(client, ApiKey::new("rest-api-key"));
//! let driver = PaginationDriver::new(PageFetcher::new(source, RetryConfig::default()));
//!
//! let harvest = driver.run(&SearchRequest::new("파이썬"), &LogProgress).await;
//! println!("{} records", harvest.records.len());
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod kakao;
pub mod mock;
mod pagination;

pub use fetcher::{FetchFailure, PageFetcher};
pub use kakao::{KakaoBookSource, AUTH_SCHEME, KAKAO_BOOK_SEARCH_URL};
pub use mock::MockSource;
pub use pagination::{
    Harvest, PaginationDriver, PartialHarvest, Termination, DEFAULT_PAGE_DELAY,
};

use crate::models::{Page, SearchRequest};
use async_trait::async_trait;

/// One request for one page of search results.
///
/// Implementations issue exactly one outbound request per call and must not
/// cache. The raw response is parsed into a [`Page`] before returning.
#[async_trait]
pub trait PageSource: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs
    fn id(&self) -> &str;

    /// Fetch page `page_index` (1-based) of `request`
    async fn fetch_page(&self, request: &SearchRequest, page_index: u32)
        -> Result<Page, SourceError>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for std::sync::Arc<S> {
    fn id(&self) -> &str {
        (**self).id()
    }

    async fn fetch_page(
        &self,
        request: &SearchRequest,
        page_index: u32,
    ) -> Result<Page, SourceError> {
        (**self).fetch_page(request, page_index).await
    }
}

/// Classified outcome of a single failed request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Connection, DNS, TLS or body transfer failure
    #[error("Network error: {0}")]
    Network(String),

    /// The per-request timeout elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// HTTP 429
    #[error("Rate limit exceeded (HTTP 429)")]
    RateLimit,

    /// HTTP 5xx
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 4xx other than 429
    #[error("Client error (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// The body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => SourceError::RateLimit,
            500..=599 => SourceError::Server {
                status,
                message: message.into(),
            },
            _ => SourceError::Client {
                status,
                message: message.into(),
            },
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::RateLimit => Some(429),
            SourceError::Server { status, .. } | SourceError::Client { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

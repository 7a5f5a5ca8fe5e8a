//! Retrying page fetcher.

use crate::models::{Page, SearchRequest};
use crate::sources::{PageSource, SourceError};
use crate::utils::{with_retry, RetryConfig};

/// A page that could not be fetched, even after retries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page {page_index} failed after {attempts} attempt(s): {error}")]
pub struct FetchFailure {
    /// Page that failed (1-based)
    pub page_index: u32,
    /// Requests issued for this page
    pub attempts: u32,
    /// Last error observed
    #[source]
    pub error: SourceError,
}

impl FetchFailure {
    /// Whether the failure came from a non-retryable error
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.error,
            SourceError::Client { .. } | SourceError::Parse(_)
        )
    }
}

/// Wraps a [`PageSource`] with the retry/backoff policy
#[derive(Debug, Clone)]
pub struct PageFetcher<S> {
    source: S,
    retry: RetryConfig,
}

impl<S: PageSource> PageFetcher<S> {
    /// Create a fetcher with the given retry policy
    pub fn new(source: S, retry: RetryConfig) -> Self {
        Self { source, retry }
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The retry policy in use
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch one page, retrying transient failures
    pub async fn fetch(&self, request: &SearchRequest, page_index: u32) -> Result<Page, FetchFailure> {
        with_retry(&self.retry, |attempt| {
            tracing::trace!(
                source = self.source.id(),
                page = page_index,
                attempt,
                "fetch attempt"
            );
            self.source.fetch_page(request, page_index)
        })
        .await
        .map_err(|e| FetchFailure {
            page_index,
            attempts: e.attempts,
            error: e.error,
        })
    }
}

//! Retry utilities with exponential backoff for resilient API calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
///
/// The wait before retry `n` (1-based) is
/// `initial_delay * backoff_multiplier^(n - 1)`, capped at `max_delay`.
/// The defaults give 0.5s, 1s and 2s before the second, third and fourth
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Upper bound for a single wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Set the number of retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the first backoff wait
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let delay = self
            .initial_delay
            .mul_f64(self.backoff_multiplier.powi(exponent));
        delay.min(self.max_delay)
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Request timeout
    Timeout,
    /// Too many requests (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
}

impl TransientError {
    /// Check if a SourceError represents a transient error
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Timeout(_) => Some(TransientError::Timeout),
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Server { .. } => Some(TransientError::ServerError),
            SourceError::Client { .. } | SourceError::Parse(_) => None,
        }
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError {
    /// Last error observed
    pub error: SourceError,
    /// Attempts made, including the first
    pub attempts: u32,
    /// Whether the last error was retryable (the budget ran out)
    pub exhausted: bool,
}

/// Execute an async operation with retry logic
///
/// `operation` receives the 1-based attempt number. Transient errors are
/// retried after the configured backoff until the retry budget runs out;
/// any other error is returned after a single attempt. No wait precedes the
/// first attempt.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = config.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempt,
                        attempt - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: false,
                    });
                };

                if attempt >= max_attempts {
                    tracing::warn!(
                        "Operation failed after {} attempts: {}",
                        attempt,
                        error
                    );
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: true,
                    });
                }

                let delay = config.delay_for_retry(attempt);
                tracing::warn!(
                    "Transient error on attempt {}/{} ({:?}): {}, retrying in {:?}",
                    attempt,
                    max_attempts,
                    transient,
                    error,
                    delay
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

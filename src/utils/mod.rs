//! Utility modules supporting a harvest run.
//!
//! - [`dedupe`]: Reduce records to one per identity key (ISBN, else title/publisher/authors)
//! - [`ResultSet`]: Insertion-ordered records keyed by [`IdentityKey`]
//! - [`write`](export::write): Write a result set as JSON and CSV
//! - [`sanitize_query`]: Turn a query into a file-name fragment
//! - [`HttpClient`]: HTTP client with a finite per-request timeout
//! - [`RetryConfig`] / [`with_retry`]: Exponential backoff for transient errors
//! - [`ProgressObserver`]: Page-by-page progress notifications
//!
//! # Deduplication
//!
//! ```rust
//! use book_harvester::models::BookBuilder;
//! use book_harvester::utils::dedupe;
//!
//! let records = vec![
//!     BookBuilder::new("Effective Python").isbn("8966263151 9788966263158").build(),
//!     BookBuilder::new("Effective Python (2nd printing)").isbn("8966263151").build(),
//! ];
//!
//! let unique = dedupe(records);
//! assert_eq!(unique.len(), 1);
//! ```
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use book_harvester::sources::SourceError;
//! use book_harvester::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::default().max_retries(3);
//! let result = with_retry(&config, |_attempt| fetch_data())
//!     .await
//!     .map_err(|e| e.error)?;
//! # Ok(())
//! # }
//! ```

mod dedup;
pub mod export;
mod filename;
mod http;
mod progress;
mod retry;

pub use dedup::{canonical_isbn, dedupe, identity_key, IdentityKey, ResultSet};
pub use export::{ExportError, WrittenFiles, CSV_COLUMNS};
pub use filename::{output_paths, sanitize_query};
pub use http::{HttpClient, DEFAULT_CONNECT_TIMEOUT};
pub use progress::{LogProgress, NoProgress, PageProgress, ProgressObserver};
pub use retry::{with_retry, RetryConfig, RetryError, TransientError};

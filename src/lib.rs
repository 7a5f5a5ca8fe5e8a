//! # Book Harvester
//!
//! Retrieves every result page of a Kakao book search, removes duplicate
//! records by ISBN, and writes the result as JSON and CSV.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Book, Page, SearchRequest)
//! - [`sources`]: The page source trait, the Kakao source, retrying fetcher and pagination driver
//! - [`utils`]: Deduplication, export, HTTP client, retry and progress utilities
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal progress bar and status output

pub mod config;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Book, SearchRequest};
pub use sources::{KakaoBookSource, PageFetcher, PageSource, PaginationDriver};
pub use utils::{dedupe, ResultSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Search request and page models.

use serde::{Deserialize, Serialize};

use crate::models::Book;

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u8 = 50;

/// Field the query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Title,
    Isbn,
    Publisher,
    Person,
}

impl Target {
    /// Query parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Title => "title",
            Target::Isbn => "isbn",
            Target::Publisher => "publisher",
            Target::Person => "person",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result ordering requested from the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    #[default]
    Accuracy,
    Latest,
}

impl Sort {
    /// Query parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Accuracy => "accuracy",
            Sort::Latest => "latest",
        }
    }
}

impl std::fmt::Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one harvest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search text
    pub query: String,

    /// Field to search; the API searches all fields when absent
    pub target: Option<Target>,

    /// Result ordering
    pub sort: Sort,

    /// Records per page (1..=50)
    pub size: u8,

    /// Upper bound on pages requested
    pub max_pages: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            target: Some(Target::Title),
            sort: Sort::Accuracy,
            size: MAX_PAGE_SIZE,
            max_pages: 20,
        }
    }
}

impl SearchRequest {
    /// Create a request with default paging for `query`
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the search target
    pub fn target(mut self, target: Option<Target>) -> Self {
        self.target = target;
        self
    }

    /// Set the sort order
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the page size
    pub fn size(mut self, size: u8) -> Self {
        self.size = size;
        self
    }

    /// Set the page cap
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// One page of results, parsed from the response body
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records on this page, in API order
    pub records: Vec<Book>,

    /// No further pages exist
    pub is_end: bool,

    /// 1-based page number
    pub page_index: u32,

    /// Number of results reachable through paging
    pub pageable_count: u64,

    /// Number of results matching the query
    pub total_count: u64,
}

impl Page {
    /// Build a page from a decoded response body
    pub fn from_body(body: SearchResponseBody, page_index: u32) -> Self {
        Self {
            records: body.documents,
            is_end: body.meta.is_end,
            page_index,
            pageable_count: body.meta.pageable_count,
            total_count: body.meta.total_count,
        }
    }
}

/// Wire shape of a search response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponseBody {
    #[serde(default)]
    pub documents: Vec<Book>,

    #[serde(default)]
    pub meta: PageMeta,
}

/// Paging metadata of a search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub is_end: bool,

    #[serde(default)]
    pub pageable_count: u64,

    #[serde(default)]
    pub total_count: u64,
}

//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::models::{Book, BookBuilder, Page, SearchRequest};
use crate::sources::{PageSource, SourceError};

/// A mock source that replays scripted outcomes per page.
///
/// Each page has a queue of outcomes consumed one per attempt. Once a page's
/// queue is empty the source answers with an empty, non-final page, which
/// makes "the API never reports the end" easy to script.
#[derive(Debug, Default)]
pub struct MockSource {
    script: Mutex<HashMap<u32, VecDeque<Result<Page, SourceError>>>>,
    requests: Mutex<Vec<u32>>,
}

impl MockSource {
    /// Create a new mock source with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page.
    pub fn page(self, page_index: u32, records: Vec<Book>, is_end: bool) -> Self {
        let count = records.len() as u64;
        self.push(
            page_index,
            Ok(Page {
                records,
                is_end,
                page_index,
                pageable_count: count,
                total_count: count,
            }),
        )
    }

    /// Queue a failed attempt.
    pub fn fail_attempt(self, page_index: u32, error: SourceError) -> Self {
        self.push(page_index, Err(error))
    }

    fn push(self, page_index: u32, outcome: Result<Page, SourceError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(page_index)
            .or_default()
            .push_back(outcome);
        self
    }

    /// Page indices in the order they were requested, one entry per attempt.
    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of attempts made for one page.
    pub fn attempts_for(&self, page_index: u32) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == page_index)
            .count()
    }
}

#[async_trait]
impl PageSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn fetch_page(
        &self,
        _request: &SearchRequest,
        page_index: u32,
    ) -> Result<Page, SourceError> {
        self.requests.lock().unwrap().push(page_index);

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&page_index)
            .and_then(|queue| queue.pop_front());

        next.unwrap_or(Ok(Page {
            records: Vec::new(),
            is_end: false,
            page_index,
            pageable_count: 0,
            total_count: 0,
        }))
    }
}

/// Helper function to create a mock book for testing.
pub fn make_book(title: &str, isbn: &str) -> Book {
    BookBuilder::new(title)
        .isbn(isbn)
        .publisher("Test Press")
        .authors(["Test Author"])
        .url(format!("https://example.com/{}", title))
        .build()
}

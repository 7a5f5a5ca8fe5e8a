//! Sequential pagination over a [`PageSource`].

use std::time::Duration;
use tokio::time::sleep;

use crate::models::{Book, Page, SearchRequest};
use crate::sources::{FetchFailure, PageFetcher, PageSource};
use crate::utils::{PageProgress, ProgressObserver};

/// Pause between successful page fetches
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Why a harvest stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A page reported `is_end`
    EndOfResults,
    /// `max_pages` pages were fetched without reaching the end
    PageLimit,
    /// A page failed for good; earlier records are kept
    Failed(FetchFailure),
}

/// Records accumulated by one run of the driver
#[derive(Debug, Clone)]
pub struct Harvest {
    /// Every record received, in page order, duplicates included
    pub records: Vec<Book>,
    /// Pages fetched successfully
    pub pages_fetched: u32,
    /// `total_count` reported by the last successful page
    pub total_count: Option<u64>,
    /// `pageable_count` reported by the last successful page
    pub pageable_count: Option<u64>,
    /// How the run ended
    pub termination: Termination,
}

impl Harvest {
    /// The API reported the last page
    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::EndOfResults)
    }

    /// The failure that ended the run, if any
    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.termination {
            Termination::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Split into the records of a finished run or a partial harvest
    pub fn into_result(self) -> Result<Vec<Book>, PartialHarvest> {
        match self.termination {
            Termination::Failed(failure) => Err(PartialHarvest {
                records: self.records,
                failure,
            }),
            _ => Ok(self.records),
        }
    }
}

/// Records gathered before a terminal fetch failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("harvest stopped with {} record(s) collected: {failure}", .records.len())]
pub struct PartialHarvest {
    pub records: Vec<Book>,
    #[source]
    pub failure: FetchFailure,
}

enum DriverState {
    Idle,
    Requesting(u32),
    Collecting(Page),
    Done(Termination),
    Failed(FetchFailure),
}

/// Drives a [`PageFetcher`] from page 1 until the end, the cap, or a failure
#[derive(Debug, Clone)]
pub struct PaginationDriver<S> {
    fetcher: PageFetcher<S>,
    page_delay: Duration,
}

impl<S: PageSource> PaginationDriver<S> {
    /// Create a driver with the default inter-request delay
    pub fn new(fetcher: PageFetcher<S>) -> Self {
        Self {
            fetcher,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Set the pause between successful page fetches
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// The underlying fetcher
    pub fn fetcher(&self) -> &PageFetcher<S> {
        &self.fetcher
    }

    /// Fetch pages sequentially and accumulate their records.
    ///
    /// Never issues two requests at once. `observer` is told about every
    /// successful page; it has no say in whether pagination continues.
    pub async fn run(&self, request: &SearchRequest, observer: &dyn ProgressObserver) -> Harvest {
        let max_pages = request.max_pages.max(1);
        let mut records: Vec<Book> = Vec::new();
        let mut pages_fetched = 0;
        let mut total_count = None;
        let mut pageable_count = None;
        let mut state = DriverState::Idle;

        loop {
            state = match state {
                DriverState::Idle => {
                    tracing::info!(
                        query = %request.query,
                        target = request.target.map(|t| t.as_str()).unwrap_or("all"),
                        sort = %request.sort,
                        size = request.size,
                        max_pages,
                        "starting harvest"
                    );
                    DriverState::Requesting(1)
                }
                DriverState::Requesting(page_index) => {
                    tracing::debug!(page = page_index, "requesting page");
                    match self.fetcher.fetch(request, page_index).await {
                        Ok(page) => DriverState::Collecting(page),
                        Err(failure) => DriverState::Failed(failure),
                    }
                }
                DriverState::Collecting(page) => {
                    let page_index = page.page_index;
                    let records_this_page = page.records.len();
                    records.extend(page.records);
                    pages_fetched += 1;
                    total_count = Some(page.total_count);
                    pageable_count = Some(page.pageable_count);

                    observer.on_page(&PageProgress {
                        page_index,
                        records_this_page,
                        cumulative_records: records.len(),
                        is_end: page.is_end,
                    });

                    if page.is_end {
                        DriverState::Done(Termination::EndOfResults)
                    } else if page_index >= max_pages {
                        DriverState::Done(Termination::PageLimit)
                    } else {
                        sleep(self.page_delay).await;
                        DriverState::Requesting(page_index + 1)
                    }
                }
                DriverState::Done(termination) => {
                    tracing::info!(
                        pages = pages_fetched,
                        records = records.len(),
                        reason = ?termination,
                        "harvest finished"
                    );
                    return Harvest {
                        records,
                        pages_fetched,
                        total_count,
                        pageable_count,
                        termination,
                    };
                }
                DriverState::Failed(failure) => {
                    tracing::error!(
                        page = failure.page_index,
                        attempts = failure.attempts,
                        records = records.len(),
                        "harvest failed: {}",
                        failure.error
                    );
                    return Harvest {
                        records,
                        pages_fetched,
                        total_count,
                        pageable_count,
                        termination: Termination::Failed(failure),
                    };
                }
            };
        }
    }
}

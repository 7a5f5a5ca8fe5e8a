//! Progress reporting for the pagination loop.
//!
//! The driver reports each successful page to a [`ProgressObserver`]. The
//! observer only watches; it cannot stop or steer pagination.

/// Observation emitted after each successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page number
    pub page_index: u32,
    /// Records on this page
    pub records_this_page: usize,
    /// Records accumulated so far, this page included
    pub cumulative_records: usize,
    /// The API reported this page as the last one
    pub is_end: bool,
}

/// Receives page progress notifications
pub trait ProgressObserver: Send + Sync {
    fn on_page(&self, progress: &PageProgress);
}

/// Reports progress as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_page(&self, progress: &PageProgress) {
        tracing::info!(
            page = progress.page_index,
            received = progress.records_this_page,
            total = progress.cumulative_records,
            is_end = progress.is_end,
            "page {} received: {} this page, {} so far",
            progress.page_index,
            progress.records_this_page,
            progress.cumulative_records
        );
        if progress.is_end {
            tracing::info!("API reported the last page, stopping");
        }
    }
}

/// Discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_page(&self, _progress: &PageProgress) {}
}

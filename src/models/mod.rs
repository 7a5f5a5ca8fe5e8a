//! Core data models for book records and search operations.

mod book;
mod search;

pub use book::{scalar_text, Book, BookBuilder};
pub use search::{
    Page, PageMeta, SearchRequest, SearchResponseBody, Sort, Target, MAX_PAGE_SIZE,
};

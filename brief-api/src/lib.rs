//! Client library for the book service
//!
//! Provides the collaborator contracts the summary tool depends on:
//! - Library listing
//! - Chapter listing for a split book
//! - Remote summary generation
//!
//! with an HTTP backend for the REST API and a mock backend for tests.

pub mod backends;
pub mod config;
pub mod error;
pub mod service;

pub use backends::{HttpBackend, MockBackend};
pub use config::Config;
pub use error::{ApiError, Result};
pub use service::{
    BookEntry, Chapter, ChapterRef, ChapterSource, GenerationMode, Library, SummaryChapter,
    SummaryRequest, SummaryResult, Summarizer,
};

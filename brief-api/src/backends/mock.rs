//! Mock book service for testing
//!
//! Serves fixed chapter lists and simulates summarization outcomes such as
//! failures, slow responses and recoveries after a number of failed calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::service::{
    BookEntry, Chapter, ChapterSource, Library, SummaryChapter, Summarizer, SummaryRequest,
    SummaryResult,
};

/// A configurable in-memory book service
pub struct MockBackend {
    /// Chapters per book, in list order
    books: HashMap<String, Vec<Chapter>>,
    /// Number of summarization calls to fail before succeeding
    fail_count: AtomicUsize,
    /// Current summarization call count
    call_count: AtomicUsize,
    /// Message of the simulated failure (None = always succeed)
    fail_with: Option<String>,
    /// Markdown returned on success
    summary: String,
    /// Artificial latency for summarization calls
    delay: Option<Duration>,
    /// Most recent summarization request
    last_request: Mutex<Option<SummaryRequest>>,
}

impl MockBackend {
    /// Create a backend whose summarization always succeeds
    pub fn always_succeeds(summary: &str) -> Self {
        Self {
            books: HashMap::new(),
            fail_count: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
            fail_with: None,
            summary: summary.to_string(),
            delay: None,
            last_request: Mutex::new(None),
        }
    }

    /// Create a backend whose summarization always fails with `message`
    pub fn always_fails(message: &str) -> Self {
        Self {
            fail_count: AtomicUsize::new(usize::MAX),
            fail_with: Some(message.to_string()),
            ..Self::always_succeeds("")
        }
    }

    /// Create a backend that fails `n` times with `message`, then succeeds
    pub fn fails_then_succeeds(n: usize, message: &str, summary: &str) -> Self {
        Self {
            fail_count: AtomicUsize::new(n),
            fail_with: Some(message.to_string()),
            ..Self::always_succeeds(summary)
        }
    }

    /// Register a book with `(id, number, title)` chapters, in list order
    pub fn with_book(mut self, book: &str, chapters: &[(&str, u32, &str)]) -> Self {
        let chapters = chapters
            .iter()
            .enumerate()
            .map(|(index, (id, number, title))| Chapter {
                id: id.to_string(),
                index,
                number: *number,
                title: title.to_string(),
            })
            .collect();
        self.books.insert(book.to_string(), chapters);
        self
    }

    /// Delay every summarization response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times generate_summary() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The last request passed to generate_summary()
    pub fn last_request(&self) -> Option<SummaryRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    fn summarize(&self, request: &SummaryRequest) -> SummaryResult {
        let chapters: Vec<SummaryChapter> = request
            .chapter_ids
            .iter()
            .filter_map(|id| self.find_chapter(&request.book_name, id))
            .map(|c| SummaryChapter {
                chapter_number: c.number,
                chapter_title: Some(c.title.clone()),
            })
            .collect();

        SummaryResult {
            gemini_summary: self.summary.clone(),
            total_chapters: chapters.len() as u32,
            chapters,
        }
    }

    fn find_chapter(&self, book: &str, id: &str) -> Option<&Chapter> {
        self.books.get(book)?.iter().find(|c| c.id == id)
    }
}

#[async_trait]
impl Library for MockBackend {
    async fn list_books(&self) -> Result<Vec<BookEntry>> {
        let mut books: Vec<BookEntry> = self
            .books
            .keys()
            .map(|name| BookEntry {
                id: name.clone(),
                name: name.clone(),
                display_name: name.replace('_', " "),
            })
            .collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(books)
    }
}

#[async_trait]
impl ChapterSource for MockBackend {
    async fn get_chapters(&self, book: &str) -> Result<Vec<Chapter>> {
        self.books
            .get(book)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                book: book.to_string(),
            })
    }
}

#[async_trait]
impl Summarizer for MockBackend {
    async fn generate_summary(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if call_num < self.fail_count.load(Ordering::SeqCst) {
            if let Some(message) = &self.fail_with {
                return Err(ApiError::Server {
                    message: message.clone(),
                    status_code: Some(500),
                });
            }
        }

        Ok(self.summarize(request))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

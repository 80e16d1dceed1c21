//! HTTP backend for the book service REST API
//!
//! Every endpoint answers with a `{ "success": bool, ... }` envelope; a
//! `false` envelope carries an `error` message.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::service::{
    BookEntry, Chapter, ChapterSource, Library, Summarizer, SummaryRequest, SummaryResult,
};

/// Backend talking to the book service over HTTP
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// Create a backend from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.effective_base_url(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Check that the service answers its health endpoint
    pub async fn health(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

        let body: HealthResponse = read_json(response).await?;
        Ok(body.message.unwrap_or(body.status))
    }

    async fn get_envelope<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        debug!("GET {}", endpoint);
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
        read_json(response).await
    }
}

// Service response types

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LibraryResponse {
    success: bool,
    #[serde(default)]
    books: Vec<BookEntry>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChaptersResponse {
    success: bool,
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChapterEntry {
    id: String,
    number: u32,
    title: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    success: bool,
    data: Option<SummaryResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to read body: {}", e)))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(text);
        return Err(ApiError::Server {
            message,
            status_code: Some(status.as_u16()),
        });
    }

    serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn envelope_error(error: Option<String>) -> ApiError {
    ApiError::Server {
        message: error.unwrap_or_else(|| "Unknown error".to_string()),
        status_code: None,
    }
}

/// Order raw chapter entries by number and assign list positions.
fn index_chapters(mut entries: Vec<ChapterEntry>) -> Vec<Chapter> {
    entries.sort_by_key(|e| e.number);
    entries
        .into_iter()
        .enumerate()
        .map(|(index, e)| Chapter {
            id: e.id,
            index,
            number: e.number,
            title: e.title,
        })
        .collect()
}

#[async_trait]
impl Library for HttpBackend {
    async fn list_books(&self) -> Result<Vec<BookEntry>> {
        let body: LibraryResponse = self.get_envelope("/library").await?;
        if !body.success {
            return Err(envelope_error(body.error));
        }
        Ok(body.books)
    }
}

#[async_trait]
impl ChapterSource for HttpBackend {
    async fn get_chapters(&self, book: &str) -> Result<Vec<Chapter>> {
        let body = match self
            .get_envelope::<ChaptersResponse>(&format!("/book-chapters/{}", book))
            .await
        {
            Err(ApiError::Server {
                status_code: Some(code),
                ..
            }) if code == StatusCode::NOT_FOUND.as_u16() => {
                return Err(ApiError::NotFound {
                    book: book.to_string(),
                });
            }
            other => other?,
        };

        if !body.success {
            return Err(envelope_error(body.error));
        }
        Ok(index_chapters(body.chapters))
    }
}

#[async_trait]
impl Summarizer for HttpBackend {
    async fn generate_summary(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        debug!(
            "POST /gemini-generation book={} chapters={}",
            request.book_name,
            request.chapter_ids.len()
        );

        let response = self
            .client
            .post(self.url("/gemini-generation"))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

        let body: GenerationResponse = read_json(response).await?;
        if !body.success {
            return Err(envelope_error(body.error));
        }
        body.data
            .ok_or_else(|| ApiError::InvalidResponse("Missing summary data".to_string()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

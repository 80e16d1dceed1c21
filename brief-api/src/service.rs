use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// A book in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// One chapter of a split book, as listed for the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable identifier, e.g. `alan_cap3`
    pub id: String,
    /// 0-based position in the ordered chapter list
    pub index: usize,
    /// Display chapter number (reading order)
    pub number: u32,
    pub title: String,
}

/// Chapter snapshot carried by a generation request and its persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub id: String,
    pub number: u32,
    pub title: String,
}

impl From<&Chapter> for ChapterRef {
    fn from(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id.clone(),
            number: chapter.number,
            title: chapter.title.clone(),
        }
    }
}

/// What the summarization service should produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    Summarization,
    Characters,
}

impl GenerationMode {
    /// Parse a mode name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "summarization" | "summary" => Some(Self::Summarization),
            "characters" | "character" => Some(Self::Characters),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summarization => write!(f, "Summarization"),
            Self::Characters => write!(f, "Characters"),
        }
    }
}

/// Payload sent to the summarization endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub book_name: String,
    pub chapter_ids: Vec<String>,
    pub mode: GenerationMode,
}

/// A chapter covered by a generated summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryChapter {
    pub chapter_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
}

/// Result of a summarization call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Markdown produced by the model
    pub gemini_summary: String,
    pub total_chapters: u32,
    #[serde(default)]
    pub chapters: Vec<SummaryChapter>,
}

impl SummaryResult {
    /// Short list of the analyzed chapters, e.g. `Cap 1, Cap 3`
    pub fn chapters_label(&self) -> String {
        self.chapters
            .iter()
            .map(|c| format!("Cap {}", c.chapter_number))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lists the books available for summarization
#[async_trait]
pub trait Library: Send + Sync {
    async fn list_books(&self) -> Result<Vec<BookEntry>>;
}

/// Lists the chapters of a split book
#[async_trait]
pub trait ChapterSource: Send + Sync {
    /// Chapters ordered by number, with `index` set to the list position.
    ///
    /// Fails with `ApiError::NotFound` when the book does not exist.
    async fn get_chapters(&self, book: &str) -> Result<Vec<Chapter>>;
}

/// Runs the remote summary generation
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate a summary over the requested chapters.
    ///
    /// There is no cancellation primitive: dropping the future is the only way
    /// to stop waiting for it.
    async fn generate_summary(&self, request: &SummaryRequest) -> Result<SummaryResult>;

    /// Backend name for display
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_request_wire_shape() {
        let request = SummaryRequest {
            book_name: "alan".to_string(),
            chapter_ids: vec!["alan_cap1".to_string(), "alan_cap3".to_string()],
            mode: GenerationMode::Characters,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["bookName"], "alan");
        assert_eq!(value["chapterIds"][1], "alan_cap3");
        assert_eq!(value["mode"], "Characters");
    }

    #[test]
    fn test_summary_result_parses_service_payload() {
        let json = r#"{
            "status": "success",
            "bookname": "alan",
            "total_chapters": 2,
            "chapters": [
                {"chapter_number": 1, "chapter_title": "Intro", "filename": "cap1[Intro].pdf"},
                {"chapter_number": 3}
            ],
            "gemini_summary": "Summary text"
        }"#;
        let result: SummaryResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.total_chapters, 2);
        assert_eq!(result.chapters[0].chapter_title.as_deref(), Some("Intro"));
        assert_eq!(result.chapters_label(), "Cap 1, Cap 3");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(GenerationMode::parse("Characters"), Some(GenerationMode::Characters));
        assert_eq!(GenerationMode::parse("summary"), Some(GenerationMode::Summarization));
        assert_eq!(GenerationMode::parse("poetry"), None);
    }

    #[test]
    fn test_chapter_ref_from_chapter() {
        let chapter = Chapter {
            id: "alan_cap2".to_string(),
            index: 1,
            number: 2,
            title: "Two".to_string(),
        };
        let chapter_ref = ChapterRef::from(&chapter);
        assert_eq!(chapter_ref.id, "alan_cap2");
        assert_eq!(chapter_ref.number, 2);
    }
}

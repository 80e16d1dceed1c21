//! Session data types for summary generation.

use brief_api::{ChapterRef, GenerationMode, SummaryRequest, SummaryResult};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Persisted status of a generation. `Idle` is the absence of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(alias = "starting")]
    Starting,
    #[serde(alias = "processing")]
    Processing,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "error")]
    Error,
}

impl SessionStatus {
    /// Whether the remote call may still be outstanding
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Processing)
    }
}

/// The single persisted record describing an in-flight or just-finished generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub book_name: String,
    /// Snapshot of the requested chapters, in document order
    pub chapters: Vec<ChapterRef>,
    #[serde(default)]
    pub mode: GenerationMode,
    pub status: SessionStatus,
    pub start_time_ms: i64,
    /// Present only when `Completed`
    #[serde(default)]
    pub result: Option<SummaryResult>,
    /// Present only when `Error`
    #[serde(default)]
    pub error: Option<String>,
    /// Last write time, used for the staleness check
    pub timestamp_ms: i64,
}

impl SessionRecord {
    /// Create a new record in the `Starting` state.
    pub fn new(request: &GenerationRequest, now_ms: i64) -> Self {
        Self {
            book_name: request.book_name.clone(),
            chapters: request.chapters.clone(),
            mode: request.mode,
            status: SessionStatus::Starting,
            start_time_ms: now_ms,
            result: None,
            error: None,
            timestamp_ms: now_ms,
        }
    }

    /// Age of the last write at `now_ms`
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp_ms
    }

    /// Whole seconds since the generation started
    pub fn elapsed_seconds(&self, now_ms: i64) -> u64 {
        ((now_ms - self.start_time_ms).max(0) / 1000) as u64
    }

    /// Reject records older than `window_ms` or ended in error.
    pub fn check_recoverable(&self, now_ms: i64, window_ms: i64) -> Result<(), SessionError> {
        if self.age_ms(now_ms) > window_ms || self.status == SessionStatus::Error {
            return Err(SessionError::StaleSession);
        }
        Ok(())
    }
}

/// Everything needed to start (or restart) a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub book_name: String,
    pub chapters: Vec<ChapterRef>,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn new(book_name: impl Into<String>, chapters: Vec<ChapterRef>, mode: GenerationMode) -> Self {
        Self {
            book_name: book_name.into(),
            chapters,
            mode,
        }
    }

    /// Payload for the summarization service
    pub fn to_summary_request(&self) -> SummaryRequest {
        SummaryRequest {
            book_name: self.book_name.clone(),
            chapter_ids: self.chapters.iter().map(|c| c.id.clone()).collect(),
            mode: self.mode,
        }
    }
}

/// Informational progress of the running generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub label: String,
    /// 0..=100
    pub percent: u8,
}

/// Guard captured at `start`; responses carrying an older epoch are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch(pub(crate) u64);

/// Whether a completion or failure was applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// The session was cancelled or superseded since the call was issued
    Discarded,
}

/// An interrupted generation found at load time.
///
/// Consumed by exactly one of [`resume`](ResumeOffer::resume) or
/// [`GenerationSession::dismiss`](super::GenerationSession::dismiss).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeOffer {
    pub book_name: String,
    pub chapters: Vec<ChapterRef>,
    pub mode: GenerationMode,
    pub elapsed_seconds: u64,
}

impl ResumeOffer {
    /// Accept the offer: the request to start again with the same chapters and mode.
    pub fn resume(self) -> GenerationRequest {
        GenerationRequest {
            book_name: self.book_name,
            chapters: self.chapters,
            mode: self.mode,
        }
    }
}

/// Outcome of inspecting storage at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision {
    NoRecovery,
    OfferResume(ResumeOffer),
    /// A finished result that was never displayed; the record is already cleared
    ShowCompleted(SummaryResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "alan",
            vec![
                ChapterRef {
                    id: "c3".to_string(),
                    number: 1,
                    title: "One".to_string(),
                },
                ChapterRef {
                    id: "c1".to_string(),
                    number: 3,
                    title: "Three".to_string(),
                },
            ],
            GenerationMode::Summarization,
        )
    }

    #[test]
    fn test_record_json_field_names() {
        let record = SessionRecord::new(&request(), 1_000);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["bookName"], "alan");
        assert_eq!(value["status"], "Starting");
        assert_eq!(value["mode"], "Summarization");
        assert_eq!(value["startTimeMs"], 1_000);
        assert_eq!(value["timestampMs"], 1_000);
        assert!(value["result"].is_null());
        assert!(value["error"].is_null());
        assert_eq!(value["chapters"][0]["number"], 1);
    }

    #[test]
    fn test_record_accepts_lowercase_status() {
        let json = r#"{
            "bookName": "alan",
            "chapters": [{"id": "c1", "number": 3, "title": "Three"}],
            "status": "processing",
            "startTimeMs": 10,
            "timestampMs": 20
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, SessionStatus::Processing);
        assert_eq!(record.mode, GenerationMode::Summarization);
        assert!(record.result.is_none());
    }

    #[test]
    fn test_check_recoverable() {
        let mut record = SessionRecord::new(&request(), 0);
        assert!(record.check_recoverable(60_000, 300_000).is_ok());
        assert_eq!(
            record.check_recoverable(400_000, 300_000),
            Err(SessionError::StaleSession)
        );

        record.status = SessionStatus::Error;
        assert_eq!(
            record.check_recoverable(1_000, 300_000),
            Err(SessionError::StaleSession)
        );
    }

    #[test]
    fn test_elapsed_seconds() {
        let record = SessionRecord::new(&request(), 5_000);
        assert_eq!(record.elapsed_seconds(47_999), 42);
        assert_eq!(record.elapsed_seconds(1_000), 0);
    }

    #[test]
    fn test_summary_request_keeps_order() {
        let summary_request = request().to_summary_request();
        assert_eq!(summary_request.chapter_ids, vec!["c3", "c1"]);
    }

    #[test]
    fn test_resume_offer_carries_mode() {
        let offer = ResumeOffer {
            book_name: "alan".to_string(),
            chapters: vec![],
            mode: GenerationMode::Characters,
            elapsed_seconds: 12,
        };
        assert_eq!(offer.resume().mode, GenerationMode::Characters);
    }
}

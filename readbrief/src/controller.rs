//! Host-level orchestration of selection and generation.
//!
//! The controller owns one [`SelectionModel`] and one [`GenerationSession`],
//! enforces the "book selected, chapters selected, nothing running"
//! preconditions, drives the remote summarization call and keeps the session
//! record fresh while it runs.

use brief_api::{Chapter, ChapterSource, GenerationMode, SummaryResult, Summarizer};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::{Result, SessionError};
use crate::observer::GenerationObserver;
use crate::selection::{ClickModifiers, SelectionModel, SelectionState};
use crate::session::{
    Delivery, Epoch, GenerationRequest, GenerationSession, RecoveryDecision, ResumeOffer,
};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// A generation whose `Starting` record is written but whose remote call has
/// not been issued yet.
#[derive(Debug)]
pub struct PendingGeneration {
    epoch: Epoch,
    request: GenerationRequest,
}

impl PendingGeneration {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

/// How a driven generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(SummaryResult),
    Failed(String),
    Cancelled,
    /// The response arrived for a session that is no longer live
    Discarded,
}

pub struct GenerateController {
    chapter_source: Arc<dyn ChapterSource>,
    summarizer: Arc<dyn Summarizer>,
    observer: Arc<dyn GenerationObserver>,
    clock: Arc<dyn Clock>,
    selection: SelectionModel,
    session: GenerationSession,
    selected_book: Option<String>,
    chapters: Vec<Chapter>,
    tick_interval: Duration,
}

impl GenerateController {
    pub fn new(
        chapter_source: Arc<dyn ChapterSource>,
        summarizer: Arc<dyn Summarizer>,
        session: GenerationSession,
        observer: Arc<dyn GenerationObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chapter_source,
            summarizer,
            observer,
            clock,
            selection: SelectionModel::new(),
            session,
            selected_book: None,
            chapters: Vec::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_selection(mut self, selection: SelectionModel) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn selected_book(&self) -> Option<&str> {
        self.selected_book.as_deref()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn session(&self) -> &GenerationSession {
        &self.session
    }

    /// True while a generation is outstanding; hosts use it to guard unloads.
    pub fn is_generating(&self) -> bool {
        self.session.is_active()
    }

    /// Load the chapters of `book` and reset the selection for the new list.
    pub async fn select_book(&mut self, book: &str) -> Result<&[Chapter]> {
        let chapters = self.chapter_source.get_chapters(book).await?;
        info!("Selected {} ({} chapters)", book, chapters.len());

        self.selection.clear();
        self.chapters = chapters;
        self.selected_book = Some(book.to_string());
        Ok(&self.chapters)
    }

    /// Click the chapter at list position `index`, now.
    pub fn click(&mut self, index: usize, modifiers: ClickModifiers) -> Result<&SelectionState> {
        let now = self.clock.now_ms();
        self.click_at(index, modifiers, now)
    }

    /// Click the chapter at list position `index` at an explicit time.
    pub fn click_at(
        &mut self,
        index: usize,
        modifiers: ClickModifiers,
        now_ms: i64,
    ) -> Result<&SelectionState> {
        let target = self
            .chapters
            .iter()
            .find(|c| c.index == index)
            .cloned()
            .ok_or_else(|| SessionError::InvalidRequest(format!("no chapter at index {}", index)))?;

        Ok(self.selection.click(&self.chapters, &target, modifiers, now_ms))
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Build a request from the current book and selection.
    pub fn prepare(&self, mode: GenerationMode) -> Result<GenerationRequest> {
        let book = self
            .selected_book
            .as_deref()
            .ok_or_else(|| SessionError::InvalidRequest("Choose a book first".to_string()))?;

        let chapters = self.selection.selected_refs(&self.chapters);
        if chapters.is_empty() {
            return Err(SessionError::InvalidRequest(
                "Select at least one chapter to generate".to_string(),
            ));
        }

        Ok(GenerationRequest::new(book, chapters, mode))
    }

    /// Start the session for `request`, refusing while another one is running.
    pub fn begin(&mut self, request: GenerationRequest) -> Result<PendingGeneration> {
        if self.session.is_active() {
            return Err(SessionError::InvalidRequest(
                "A generation is already in progress".to_string(),
            ));
        }

        let epoch = self.session.start(&request)?;
        self.observer.on_progress("Starting generation...", 0);
        Ok(PendingGeneration { epoch, request })
    }

    /// Issue the remote call for `pending` and wait for it, re-persisting the
    /// session every tick until the response arrives or `cancel` fires.
    pub async fn drive(
        &mut self,
        pending: PendingGeneration,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome> {
        let PendingGeneration { epoch, request } = pending;
        self.report("Processing chapters...", 30);

        let summary_request = request.to_summary_request();
        let summarizer = Arc::clone(&self.summarizer);
        debug!(
            "Calling {} for {} chapters",
            summarizer.name(),
            summary_request.chapter_ids.len()
        );
        let call = summarizer.generate_summary(&summary_request);
        tokio::pin!(call);

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let response = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancel();
                    return Ok(GenerationOutcome::Cancelled);
                }
                response = &mut call => break response,
                _ = ticker.tick() => {
                    let now = self.clock.now_ms();
                    self.session.tick(now);
                }
            }
        };

        match response {
            Ok(result) => {
                self.report("Receiving summary...", 70);
                if self.session.complete(epoch, result.clone()) == Delivery::Discarded {
                    return Ok(GenerationOutcome::Discarded);
                }
                self.report("Completed!", 100);
                self.observer.on_completed(&result);
                self.session.clear();
                Ok(GenerationOutcome::Completed(result))
            }
            Err(err) => {
                let message = SessionError::from(err).to_string();
                if self.session.fail(epoch, &message) == Delivery::Discarded {
                    return Ok(GenerationOutcome::Discarded);
                }
                self.observer.on_error(&message);
                self.session.clear();
                Ok(GenerationOutcome::Failed(message))
            }
        }
    }

    /// Generate over the current selection: prepare, begin and drive.
    pub async fn generate(
        &mut self,
        mode: GenerationMode,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome> {
        let request = self.prepare(mode)?;
        let pending = self.begin(request)?;
        self.drive(pending, cancel).await
    }

    /// Stop caring about the running generation.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.session.cancel();
        if cancelled {
            self.observer.on_cancelled();
        }
        cancelled
    }

    /// Check storage for a generation interrupted by a previous run.
    ///
    /// Completed results are handed to the observer directly. An interrupted
    /// generation is announced and returned so the host can answer it.
    pub fn recover_on_load(&mut self) -> Option<ResumeOffer> {
        let now = self.clock.now_ms();
        match self.session.recover_on_load(now) {
            RecoveryDecision::NoRecovery => None,
            RecoveryDecision::ShowCompleted(result) => {
                self.observer.on_completed(&result);
                None
            }
            RecoveryDecision::OfferResume(offer) => {
                self.observer.on_recovery_offer(&offer);
                Some(offer)
            }
        }
    }

    /// Accept a recovery offer: start again with the same book, chapters and mode.
    pub async fn resume(
        &mut self,
        offer: ResumeOffer,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome> {
        let request = offer.resume();
        if self.selected_book.as_deref() != Some(request.book_name.as_str()) {
            self.selected_book = Some(request.book_name.clone());
            self.chapters.clear();
            self.selection.clear();
        }
        let pending = self.begin(request)?;
        self.drive(pending, cancel).await
    }

    /// Decline a recovery offer.
    pub fn dismiss(&mut self, offer: ResumeOffer) {
        self.session.dismiss(offer);
    }

    fn report(&mut self, label: &str, percent: u8) {
        self.session.advance(label, percent);
        self.observer.on_progress(label, percent);
    }
}

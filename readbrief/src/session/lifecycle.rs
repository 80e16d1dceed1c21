//! The generation session state machine.
//!
//! `Idle -> Starting -> Processing -> {Completed | Error}`, with every status
//! change written to the store. Storage failures degrade the session to
//! in-memory operation; they never surface to the caller.

use brief_api::SummaryResult;
use log::{debug, info, warn};

use super::persistence::{self, KeyValueStore, StorageError};
use super::types::{
    Delivery, Epoch, GenerationRequest, Progress, RecoveryDecision, ResumeOffer, SessionRecord,
    SessionStatus,
};
use crate::clock::Clock;
use crate::error::{Result, SessionError};

/// Records older than this are not offered for recovery.
pub const STALE_AFTER_MS: i64 = 5 * 60 * 1000;

pub struct GenerationSession {
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    current: Option<SessionRecord>,
    progress: Option<Progress>,
    epoch: u64,
    stale_after_ms: i64,
    degraded: bool,
}

impl GenerationSession {
    pub fn new(store: Box<dyn KeyValueStore>, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            current: None,
            progress: None,
            epoch: 0,
            stale_after_ms: STALE_AFTER_MS,
            degraded: false,
        }
    }

    /// Override the recovery window.
    pub fn with_stale_after_ms(mut self, stale_after_ms: i64) -> Self {
        self.stale_after_ms = stale_after_ms;
        self
    }

    /// Current record, `None` while idle
    pub fn record(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }

    pub fn status(&self) -> Option<SessionStatus> {
        self.current.as_ref().map(|r| r.status)
    }

    /// True while `Starting` or `Processing`
    pub fn is_active(&self) -> bool {
        self.status().is_some_and(SessionStatus::is_active)
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// True once a storage operation has failed; recovery is then unavailable.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Begin a new generation. The `Starting` record is written before this returns.
    ///
    /// Any previous session is superseded: its epoch no longer matches.
    pub fn start(&mut self, request: &GenerationRequest) -> Result<Epoch> {
        if request.book_name.trim().is_empty() {
            return Err(SessionError::InvalidRequest("no book selected".to_string()));
        }
        if request.chapters.is_empty() {
            return Err(SessionError::InvalidRequest(
                "no chapters selected".to_string(),
            ));
        }
        if self.is_active() {
            warn!("Starting a new generation while another is active; superseding it");
        }

        self.epoch += 1;
        let record = SessionRecord::new(request, self.clock.now_ms());
        info!(
            "Generation started for {} ({} chapters, {})",
            record.book_name,
            record.chapters.len(),
            record.mode
        );
        self.current = Some(record);
        self.progress = None;
        self.persist();

        Ok(Epoch(self.epoch))
    }

    /// Report progress. The first call moves `Starting` to `Processing`.
    pub fn advance(&mut self, label: &str, percent: u8) {
        if !self.is_active() {
            debug!("Ignoring progress '{}' while not generating", label);
            return;
        }

        self.progress = Some(Progress {
            label: label.to_string(),
            percent: percent.min(100),
        });

        if self.status() == Some(SessionStatus::Starting) {
            self.set_status(SessionStatus::Processing);
            self.persist();
        }
    }

    /// Deliver the remote result. Discarded unless `epoch` is the live session's.
    pub fn complete(&mut self, epoch: Epoch, result: SummaryResult) -> Delivery {
        if !self.accepts(epoch) {
            warn!("Discarding summary for a cancelled or superseded generation");
            return Delivery::Discarded;
        }

        if let Some(record) = self.current.as_mut() {
            record.result = Some(result);
            record.error = None;
        }
        self.set_status(SessionStatus::Completed);
        self.persist();
        info!("Generation completed");
        Delivery::Accepted
    }

    /// Deliver a remote failure. Discarded unless `epoch` is the live session's.
    pub fn fail(&mut self, epoch: Epoch, message: &str) -> Delivery {
        if !self.accepts(epoch) {
            warn!("Discarding failure for a cancelled or superseded generation: {}", message);
            return Delivery::Discarded;
        }

        if let Some(record) = self.current.as_mut() {
            record.error = Some(message.to_string());
            record.result = None;
        }
        self.set_status(SessionStatus::Error);
        self.persist();
        warn!("Generation failed: {}", message);
        Delivery::Accepted
    }

    /// Stop caring about the outstanding call. Returns false when nothing was running.
    ///
    /// The remote request is not interrupted; its response will be discarded.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        info!("Generation cancelled");
        // Bump so late responses for the cancelled epoch are dropped even if
        // a new session is not started.
        self.epoch += 1;
        self.clear();
        true
    }

    /// Re-persist the running record with a fresh timestamp.
    pub fn tick(&mut self, now_ms: i64) {
        if self.status() != Some(SessionStatus::Processing) {
            return;
        }
        if let Some(record) = self.current.as_mut() {
            record.timestamp_ms = now_ms;
        }
        self.write_current();
    }

    /// Return to idle and delete the persisted record.
    pub fn clear(&mut self) {
        self.current = None;
        self.progress = None;
        self.remove_persisted();
    }

    /// Inspect the persisted record left by a previous page session.
    pub fn recover_on_load(&mut self, now_ms: i64) -> RecoveryDecision {
        let record = match persistence::load_record(self.store.as_ref()) {
            Ok(Some(record)) => record,
            Ok(None) => return RecoveryDecision::NoRecovery,
            Err(StorageError::Corrupt(e)) => {
                warn!("Discarding unreadable session record: {}", e);
                self.remove_persisted();
                return RecoveryDecision::NoRecovery;
            }
            Err(e) => {
                persistence::report("read", &e);
                self.degraded = true;
                return RecoveryDecision::NoRecovery;
            }
        };

        if let Err(e) = record.check_recoverable(now_ms, self.stale_after_ms) {
            debug!(
                "{} for {} (status {:?}, age {}ms); clearing",
                e,
                record.book_name,
                record.status,
                record.age_ms(now_ms)
            );
            self.remove_persisted();
            return RecoveryDecision::NoRecovery;
        }

        match record.status {
            SessionStatus::Starting | SessionStatus::Processing => {
                info!("Found interrupted generation for {}", record.book_name);
                RecoveryDecision::OfferResume(ResumeOffer {
                    elapsed_seconds: record.elapsed_seconds(now_ms),
                    book_name: record.book_name,
                    chapters: record.chapters,
                    mode: record.mode,
                })
            }
            SessionStatus::Completed => {
                self.remove_persisted();
                match record.result {
                    Some(result) => RecoveryDecision::ShowCompleted(result),
                    None => RecoveryDecision::NoRecovery,
                }
            }
            SessionStatus::Error => {
                self.remove_persisted();
                RecoveryDecision::NoRecovery
            }
        }
    }

    /// Decline a recovery offer and forget the interrupted generation.
    pub fn dismiss(&mut self, offer: ResumeOffer) {
        debug!("Recovery dismissed for {}", offer.book_name);
        self.remove_persisted();
    }

    fn accepts(&self, epoch: Epoch) -> bool {
        epoch.0 == self.epoch && self.is_active()
    }

    fn set_status(&mut self, status: SessionStatus) {
        if let Some(record) = self.current.as_mut() {
            debug!("Session status {:?} -> {:?}", record.status, status);
            record.status = status;
        }
    }

    /// Stamp the record with the current time and write it.
    fn persist(&mut self) {
        let now = self.clock.now_ms();
        if let Some(record) = self.current.as_mut() {
            record.timestamp_ms = now;
        }
        self.write_current();
    }

    fn write_current(&mut self) {
        let Some(record) = self.current.as_ref() else {
            return;
        };
        if let Err(e) = persistence::save_record(self.store.as_ref(), record) {
            persistence::report("write", &e);
            self.degraded = true;
        }
    }

    fn remove_persisted(&mut self) {
        if let Err(e) = persistence::clear_record(self.store.as_ref()) {
            persistence::report("remove", &e);
            self.degraded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::persistence::{MemoryStore, SESSION_KEY, load_record};
    use brief_api::{ChapterRef, GenerationMode, SummaryChapter};

    /// A store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn remove(&self, _key: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    fn chapter(id: &str, number: u32) -> ChapterRef {
        ChapterRef {
            id: id.to_string(),
            number,
            title: format!("Chapter {}", number),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "alan",
            vec![chapter("c3", 1), chapter("c1", 3)],
            GenerationMode::Summarization,
        )
    }

    fn summary() -> SummaryResult {
        SummaryResult {
            gemini_summary: "# Alan".to_string(),
            total_chapters: 2,
            chapters: vec![
                SummaryChapter {
                    chapter_number: 1,
                    chapter_title: None,
                },
                SummaryChapter {
                    chapter_number: 3,
                    chapter_title: None,
                },
            ],
        }
    }

    fn setup(now_ms: i64) -> (GenerationSession, MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(now_ms);
        let session = GenerationSession::new(Box::new(store.clone()), Box::new(clock.clone()));
        (session, store, clock)
    }

    fn stored(store: &MemoryStore) -> Option<SessionRecord> {
        load_record(store).unwrap()
    }

    fn persist_raw(store: &MemoryStore, status: SessionStatus, start: i64, timestamp: i64) {
        let mut record = SessionRecord::new(&request(), start);
        record.status = status;
        record.timestamp_ms = timestamp;
        if status == SessionStatus::Completed {
            record.result = Some(summary());
        }
        persistence::save_record(store, &record).unwrap();
    }

    #[test]
    fn test_start_persists_starting_record() {
        let (mut session, store, _clock) = setup(1_000);
        session.start(&request()).unwrap();

        let record = stored(&store).unwrap();
        assert_eq!(record.status, SessionStatus::Starting);
        assert_eq!(record.start_time_ms, 1_000);
        assert_eq!(record.chapters[0].number, 1);
        assert!(session.is_active());
    }

    #[test]
    fn test_start_rejects_empty_request() {
        let (mut session, store, _clock) = setup(0);

        let no_chapters = GenerationRequest::new("alan", vec![], GenerationMode::Summarization);
        assert!(matches!(
            session.start(&no_chapters),
            Err(SessionError::InvalidRequest(_))
        ));

        let no_book = GenerationRequest::new(" ", vec![chapter("c1", 1)], GenerationMode::Summarization);
        assert!(matches!(
            session.start(&no_book),
            Err(SessionError::InvalidRequest(_))
        ));

        assert!(stored(&store).is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_advance_moves_to_processing() {
        let (mut session, store, _clock) = setup(0);
        session.start(&request()).unwrap();

        session.advance("Processing chapters...", 30);
        session.advance("Still going", 250);

        assert_eq!(session.status(), Some(SessionStatus::Processing));
        assert_eq!(session.progress().unwrap().percent, 100);
        assert_eq!(stored(&store).unwrap().status, SessionStatus::Processing);
    }

    #[test]
    fn test_advance_while_idle_is_ignored() {
        let (mut session, _store, _clock) = setup(0);
        session.advance("nothing", 10);
        assert!(session.progress().is_none());
        assert!(session.status().is_none());
    }

    #[test]
    fn test_complete_persists_result_then_clear_removes() {
        let (mut session, store, _clock) = setup(0);
        let epoch = session.start(&request()).unwrap();
        session.advance("Processing chapters...", 30);

        assert_eq!(session.complete(epoch, summary()), Delivery::Accepted);
        let record = stored(&store).unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.result, Some(summary()));

        session.clear();
        assert!(stored(&store).is_none());
        assert!(session.status().is_none());
    }

    #[test]
    fn test_fail_persists_error() {
        let (mut session, store, _clock) = setup(0);
        let epoch = session.start(&request()).unwrap();

        assert_eq!(session.fail(epoch, "HTTP 500"), Delivery::Accepted);
        let record = stored(&store).unwrap();
        assert_eq!(record.status, SessionStatus::Error);
        assert_eq!(record.error.as_deref(), Some("HTTP 500"));
        assert!(record.result.is_none());
    }

    #[test]
    fn test_cancel_clears_and_discards_late_response() {
        let (mut session, store, _clock) = setup(0);
        let epoch = session.start(&request()).unwrap();
        session.advance("Processing chapters...", 30);

        assert!(session.cancel());
        assert!(stored(&store).is_none());
        assert!(session.status().is_none());

        assert_eq!(session.complete(epoch, summary()), Delivery::Discarded);
        assert_eq!(session.fail(epoch, "late"), Delivery::Discarded);
        assert!(stored(&store).is_none());
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let (mut session, _store, _clock) = setup(0);
        assert!(!session.cancel());
    }

    #[test]
    fn test_superseded_epoch_is_discarded() {
        let (mut session, store, _clock) = setup(0);
        let first = session.start(&request()).unwrap();
        let second = session.start(&request()).unwrap();
        assert_ne!(first, second);

        assert_eq!(session.complete(first, summary()), Delivery::Discarded);
        assert_eq!(stored(&store).unwrap().status, SessionStatus::Starting);
        assert_eq!(session.complete(second, summary()), Delivery::Accepted);
    }

    #[test]
    fn test_tick_refreshes_timestamp_only_while_processing() {
        let (mut session, store, clock) = setup(1_000);
        session.start(&request()).unwrap();

        session.tick(2_000);
        assert_eq!(stored(&store).unwrap().timestamp_ms, 1_000);

        clock.set(1_500);
        session.advance("Processing chapters...", 30);
        session.tick(2_000);
        session.tick(3_000);
        let record = stored(&store).unwrap();
        assert_eq!(record.timestamp_ms, 3_000);
        assert_eq!(record.start_time_ms, 1_000);
    }

    #[test]
    fn test_recover_nothing_stored() {
        let (mut session, _store, _clock) = setup(0);
        assert_eq!(session.recover_on_load(1_000), RecoveryDecision::NoRecovery);
    }

    #[test]
    fn test_recover_stale_processing_is_cleared() {
        let now = 10_000_000;
        let (mut session, store, _clock) = setup(now);
        persist_raw(&store, SessionStatus::Processing, now - 500_000, now - 400_000);

        assert_eq!(session.recover_on_load(now), RecoveryDecision::NoRecovery);
        assert!(stored(&store).is_none());
    }

    #[test]
    fn test_recover_fresh_processing_offers_resume() {
        let now = 10_000_000;
        let (mut session, store, _clock) = setup(now);
        persist_raw(&store, SessionStatus::Processing, now - 90_000, now - 60_000);

        match session.recover_on_load(now) {
            RecoveryDecision::OfferResume(offer) => {
                assert_eq!(offer.book_name, "alan");
                assert_eq!(offer.elapsed_seconds, 90);
                assert_eq!(offer.chapters.len(), 2);
            }
            other => panic!("expected resume offer, got {:?}", other),
        }
        // The record stays until the offer is answered
        assert!(stored(&store).is_some());
        assert!(!session.is_active());
    }

    #[test]
    fn test_dismiss_clears_record() {
        let now = 10_000_000;
        let (mut session, store, _clock) = setup(now);
        persist_raw(&store, SessionStatus::Starting, now - 1_000, now - 1_000);

        let RecoveryDecision::OfferResume(offer) = session.recover_on_load(now) else {
            panic!("expected resume offer");
        };
        session.dismiss(offer);
        assert!(stored(&store).is_none());
    }

    #[test]
    fn test_recover_completed_shows_result_and_clears() {
        let now = 10_000_000;
        let (mut session, store, _clock) = setup(now);
        persist_raw(&store, SessionStatus::Completed, now - 5_000, now - 1_000);

        assert_eq!(
            session.recover_on_load(now),
            RecoveryDecision::ShowCompleted(summary())
        );
        assert!(stored(&store).is_none());
    }

    #[test]
    fn test_recover_error_is_cleared() {
        let now = 10_000_000;
        let (mut session, store, _clock) = setup(now);
        persist_raw(&store, SessionStatus::Error, now - 5_000, now - 1_000);

        assert_eq!(session.recover_on_load(now), RecoveryDecision::NoRecovery);
        assert!(stored(&store).is_none());
    }

    #[test]
    fn test_recover_corrupt_record_is_cleared() {
        let (mut session, store, _clock) = setup(0);
        store.set(SESSION_KEY, "{broken").unwrap();

        assert_eq!(session.recover_on_load(0), RecoveryDecision::NoRecovery);
        assert!(store.get(SESSION_KEY).unwrap().is_none());
        assert!(!session.is_degraded());
    }

    #[test]
    fn test_storage_failure_degrades_to_memory() {
        let clock = ManualClock::new(0);
        let mut session = GenerationSession::new(Box::new(BrokenStore), Box::new(clock));

        let epoch = session.start(&request()).unwrap();
        assert!(session.is_degraded());
        session.advance("Processing chapters...", 30);
        session.tick(1_000);
        assert_eq!(session.status(), Some(SessionStatus::Processing));

        assert_eq!(session.complete(epoch, summary()), Delivery::Accepted);
        assert_eq!(session.record().unwrap().result, Some(summary()));
        session.clear();
        assert_eq!(session.recover_on_load(0), RecoveryDecision::NoRecovery);
    }

    #[test]
    fn test_custom_stale_window() {
        let now = 1_000_000;
        let (session, store, _clock) = setup(now);
        let mut session = session.with_stale_after_ms(30_000);
        persist_raw(&store, SessionStatus::Processing, now - 60_000, now - 60_000);

        assert_eq!(session.recover_on_load(now), RecoveryDecision::NoRecovery);
    }
}

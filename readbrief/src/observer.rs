//! Host callbacks for generation state changes.
//!
//! The core never renders anything itself; it reports through this trait and
//! the host decides how to show progress, results, errors and recovery prompts.

use brief_api::SummaryResult;
use std::sync::Mutex;

use crate::session::ResumeOffer;

pub trait GenerationObserver: Send + Sync {
    fn on_progress(&self, label: &str, percent: u8);

    fn on_completed(&self, result: &SummaryResult);

    fn on_error(&self, message: &str);

    /// An interrupted generation was found. Answer through
    /// `GenerateController::resume` or `GenerateController::dismiss`.
    fn on_recovery_offer(&self, offer: &ResumeOffer);

    fn on_cancelled(&self) {}
}

/// Something an [`EventLog`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Progress { label: String, percent: u8 },
    Completed(SummaryResult),
    Error(String),
    RecoveryOffer(ResumeOffer),
    Cancelled,
}

/// Observer that records every callback, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ObserverEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Percentages of all progress events, in order
    pub fn progress_percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObserverEvent::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObserverEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl GenerationObserver for EventLog {
    fn on_progress(&self, label: &str, percent: u8) {
        self.push(ObserverEvent::Progress {
            label: label.to_string(),
            percent,
        });
    }

    fn on_completed(&self, result: &SummaryResult) {
        self.push(ObserverEvent::Completed(result.clone()));
    }

    fn on_error(&self, message: &str) {
        self.push(ObserverEvent::Error(message.to_string()));
    }

    fn on_recovery_offer(&self, offer: &ResumeOffer) {
        self.push(ObserverEvent::RecoveryOffer(offer.clone()));
    }

    fn on_cancelled(&self) {
        self.push(ObserverEvent::Cancelled);
    }
}

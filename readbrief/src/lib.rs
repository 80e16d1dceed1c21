//! readbrief - pick chapters of a split book and generate AI summaries
//!
//! The two stateful pieces are the [`selection::SelectionModel`], which turns
//! clicks into a chapter selection, and the [`session::GenerationSession`],
//! which persists a running generation so it can be recovered after a
//! restart. [`controller::GenerateController`] wires them to the book service.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod selection;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ReadBriefConfig;
pub use controller::{GenerateController, GenerationOutcome, PendingGeneration};
pub use error::{Result, SessionError};
pub use observer::{EventLog, GenerationObserver, ObserverEvent};
pub use selection::{ClickModifiers, SelectionModel, SelectionState};
pub use session::{GenerationRequest, GenerationSession, RecoveryDecision, ResumeOffer};

//! Generation session lifecycle with persistence and recovery support.

mod lifecycle;
mod persistence;
mod types;

pub use lifecycle::{GenerationSession, STALE_AFTER_MS};
pub use persistence::{
    FileStore, KeyValueStore, MemoryStore, SESSION_KEY, StorageError, clear_record, load_record,
    save_record,
};
pub use types::{
    Delivery, Epoch, GenerationRequest, Progress, RecoveryDecision, ResumeOffer, SessionRecord,
    SessionStatus,
};

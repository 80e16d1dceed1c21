//! Error taxonomy for selection and generation sessions.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Rejected before any persistence or network call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The summarization call rejected or timed out
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    /// Recovered record is too old or ended in error
    #[error("Stale session")]
    StaleSession,

    /// Durable storage could not be read or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<brief_api::ApiError> for SessionError {
    fn from(err: brief_api::ApiError) -> Self {
        Self::RemoteFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

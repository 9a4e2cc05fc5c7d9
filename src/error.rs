//! Error handling

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Case/event store failure (surfaced to the delivery layer for retry)
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A verdict event failed validation and must not be persisted
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Lookup for a case that does not exist
    #[error("case not found: {0}")]
    CaseNotFound(String),

    /// The ingestion channel is closed; no more events can be submitted
    #[error("ingest channel closed")]
    ChannelClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether redelivery can plausibly succeed. Validation failures are
    /// permanent; store and I/O errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Store(_) | AppError::Io(_) => true,
            AppError::InvalidEvent(_) | AppError::CaseNotFound(_) | AppError::ChannelClosed => {
                false
            }
        }
    }
}

use killfeed_ports::{FetchError, QueueError, StorageError};
use thiserror::Error;

/// Reasons a single work item is dropped, or a feed session ends
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Payload could not be decoded: {0}")]
    Decode(String),

    #[error("Payload is for killmail {got}, expected {expected}")]
    IdMismatch { expected: u64, got: u64 },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Feed connection error: {0}")]
    Feed(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl From<tokio_tungstenite::tungstenite::Error> for PipelineError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        PipelineError::Feed(err.to_string())
    }
}

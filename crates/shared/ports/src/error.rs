use thiserror::Error;

/// Errors raised by killmail storage backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Record serialization failed: {0}")]
    Serialization(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by queue backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(String),

    #[error("Queue entry is corrupt: {0}")]
    Corrupt(String),
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    #[error("Backup write failed: {0}")]
    Io(String),

    #[error("Backup envelope could not be encoded: {0}")]
    Encode(String),
}

/// A killmail fetch that did not yield a usable payload
///
/// `status` is the upstream status code, or `0` when no response was
/// received at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch failed with status {status}: {reason}")]
pub struct FetchError {
    pub status: u16,
    pub reason: String,
}

impl FetchError {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }

    /// The upstream rejects a mismatched id/hash pair with 422
    pub fn is_invalid_hash(&self) -> bool {
        self.status == 422
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("load signal unavailable: {0}")]
pub struct LoadSignalError(pub String);

use chrono::NaiveDate;
use killfeed_ports::{QueueError, StorageError};
use thiserror::Error;

/// Failures talking to the totals/history source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("{0} returned an empty body")]
    EmptyBody(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response could not be decoded: {0}")]
    Decode(String),

    #[error("Client construction failed: {0}")]
    Build(String),
}

impl HistoryError {
    /// Worth another attempt after a backoff
    ///
    /// Client errors other than 429 will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            HistoryError::Status { status, .. } => *status >= 500 || *status == 429,
            HistoryError::EmptyBody(_) | HistoryError::Transport(_) | HistoryError::Decode(_) => {
                true
            }
            HistoryError::Build(_) => false,
        }
    }
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

impl From<reqwest::Error> for HistoryError {
    fn from(err: reqwest::Error) -> Self {
        HistoryError::Transport(err.to_string())
    }
}

/// Conditions that abort a reconciliation run
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unable to fetch history totals: {0}")]
    Totals(HistoryError),

    #[error("Unable to fetch history for {date} after {attempts} attempts: {source}")]
    DayFetch {
        date: NaiveDate,
        attempts: u32,
        #[source]
        source: HistoryError,
    },

    #[error("{count} consecutive dates missing from totals (last {last})")]
    MissingDates { count: u32, last: NaiveDate },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Reconciliation cancelled")]
    Cancelled,
}

pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

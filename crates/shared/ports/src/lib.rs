//! Killfeed Ports
//!
//! Port definitions (traits) for the killfeed ingestion system.
//! These define the boundaries between the ingestion logic and infrastructure:
//!
//! - [`KillmailRepository`] / [`QueueStore`]: storage and the durable work queue
//! - [`BackupSink`] / [`StatsObserver`]: best-effort downstream collaborators
//! - [`KillmailFetcher`] / [`LoadSignalSource`]: upstream reads
//! - [`TelemetrySink`] / [`AdmissionGate`]: the shared health context seen
//!   from the gateway and from pipeline workers

mod clock;
mod error;
mod health;
mod queue;
mod sinks;
mod storage;
mod upstream;

pub use clock::Clock;
pub use error::{
    BackupError, FetchError, LoadSignalError, QueueError, QueueResult, StorageError,
    StorageResult,
};
pub use health::{AdmissionGate, TelemetrySink};
pub use queue::QueueStore;
pub use sinks::{BackupSink, StatsObserver};
pub use storage::{InsertOutcome, KillmailFilter, KillmailRepository};
pub use upstream::{KillmailFetcher, LoadSignalSource};

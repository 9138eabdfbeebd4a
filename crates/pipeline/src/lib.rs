//! Killfeed Pipeline
//!
//! The steady-state ingestion path:
//!
//! ```text
//!  FeedListener ─┐
//!  manual add ───┼──► Dispatcher ──► QueueStore ──► Importer ──► KillmailRepository
//!  Reconciler ───┘                                   │  ▲            │
//!                                                    │  └ AdmissionGate
//!                                                    ▼               ▼
//!                                             KillmailFetcher   BackupSink / StatsObserver
//! ```

pub mod dispatch;
pub mod error;
pub mod feed;
pub mod importer;
pub mod normalize;

pub use dispatch::{DEFAULT_BATCH_SIZE, Dispatcher};
pub use error::{PipelineError, PipelineResult};
pub use feed::{FeedConfig, FeedListener, parse_feed_message};
pub use importer::{ImportSummary, Importer, ImporterConfig, InFlight, ItemOutcome, RunMode};

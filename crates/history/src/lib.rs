//! Killfeed History
//!
//! Batch backfill that makes local storage agree with the authoritative
//! per-day totals. Missing killmails are pushed onto the same queue the
//! importer drains; the driver waits for the queue to empty before it
//! re-counts a day.

pub mod error;
pub mod reconcile;
pub mod source;

pub use error::{HistoryError, HistoryResult, ReconcileError, ReconcileResult};
pub use reconcile::{
    DayReport, Direction, ReconcileConfig, ReconcileReport, ReconcileRequest, Reconciler, walk,
};
pub use source::{
    DEFAULT_HISTORY_URL, HistoryClientConfig, HistorySource, ZkillHistoryClient, parse_day_hashes,
    parse_totals,
};

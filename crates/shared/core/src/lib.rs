//! Killfeed Core Domain
//!
//! Pure domain types for the killfeed ingestion system.
//! This crate contains no async, no I/O, and is 100% unit testable.
//!
//! ## Overview
//!
//! ```text
//!   feed / backfill / manual add
//!              │ WorkItem {id, hash}
//!              ▼
//!        ┌───────────┐   popMin   ┌──────────┐  fetch  ┌──────────┐
//!        │   Queue   │ ─────────► │ Importer │ ──────► │ Upstream │
//!        └───────────┘            └────┬─────┘         └────┬─────┘
//!                                      │ Killmail           │ StatusBucket,
//!                                      ▼                    │ ErrorBudget
//!                                  Storage                  ▼
//!                                                    AdmissionState
//! ```

pub mod admission;
pub mod killmail;
pub mod telemetry;
pub mod values;
pub mod work_item;

// Re-export commonly used types at crate root
pub use admission::{AdmissionState, ErrorBudget, LoadSignal};
pub use killmail::{
    Attacker, Item, Killmail, KillmailPayload, NPC_CORPORATION_CEILING, Position, Victim,
};
pub use telemetry::StatusBucket;
pub use values::{DAY_FORMAT, DateRange, Timestamp, format_day, parse_day};
pub use work_item::{ParseWorkItemError, WorkItem};

//! Killfeed Runner
//!
//! Loads configuration and wires the components into the commands the
//! `killfeed` binary exposes:
//!
//! ```text
//!              ┌───────────────┐   ┌──────────────┐
//!              │ HealthTracker │   │ StatusPoller │
//!              └───────┬───────┘   └──────┬───────┘
//!                      ▼                  ▼
//!                   ┌────────────────────────┐
//!                   │     HealthContext      │◄── EsiClient telemetry
//!                   └───────────┬────────────┘
//!                               │ admission
//! FeedListener ─┐               ▼
//! Reconciler ───┼─► SqliteStore queue ──► Importer ──► SqliteStore killmails
//! add ──────────┘                            │
//!                                            └──► DirectoryBackup, DailyTally
//! ```

pub mod app;
pub mod config;

pub use app::{App, AppError, AppResult};
pub use config::{ConfigError, KillfeedConfig};

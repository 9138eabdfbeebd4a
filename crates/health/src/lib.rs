//! Killfeed Health Tracker
//!
//! Turns upstream signals into a single admission state that every
//! ingestion worker consults before starting work:
//!
//! - **Load signal**: player count and VIP flag from the status endpoint
//! - **Error budget**: remaining errors and reset time from response headers
//! - **Downtime window**: the daily scheduled maintenance slot (UTC)
//!
//! ## Architecture
//!
//! ```text
//!  StatusPoller ──LoadSignal──┐        ┌──◄── EsiClient (TelemetrySink)
//!   (every 30s)               ▼        ▼       status buckets, error budget
//!                      ┌─────────────────────┐
//!                      │    HealthContext    │
//!                      │ signals │ tracking  │
//!                      │  state (watch)      │
//!                      └──────┬───────▲──────┘
//!                 await_      │       │ apply transition
//!                 clearance() │       │
//!                      ┌──────▼──┐ ┌──┴────────────┐
//!                      │ Workers │ │ HealthTracker │ (every 1s)
//!                      └─────────┘ └───────────────┘
//! ```
//!
//! ## States
//!
//! | State    | Gate behaviour          | Entered when                            |
//! |----------|-------------------------|-----------------------------------------|
//! | Green    | pass                    | budget > 20, window closed, budget reset |
//! | Yellow   | pass after 250ms        | budget 10..=20                          |
//! | Red      | block                   | budget < 10                             |
//! | Downtime | block                   | players < 100, VIP, or inside the window |

pub mod config;
pub mod context;
pub mod poller;
pub mod tracker;
pub mod tracking;
pub mod transition;
pub mod window;

// Re-export main types
pub use config::{GateConfig, TrackerConfig};
pub use context::HealthContext;
pub use poller::StatusPoller;
pub use tracker::HealthTracker;
pub use tracking::{TrackingLog, TrackingSnapshot};
pub use transition::{AdmissionPolicy, Reason, Signals, Transition, evaluate};
pub use window::{DowntimeWindow, WindowError};

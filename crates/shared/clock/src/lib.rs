//! Killfeed Clock Infrastructure
//!
//! Time sources behind the [`Clock`] port:
//!
//! - [`SystemClock`]: wall-clock UTC time, used in production
//! - [`ManualClock`]: frozen time that only moves when a test advances it
//!
//! ## Usage
//!
//! ```ignore
//! use killfeed_clock::{Clock, ManualClock};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 57, 0).unwrap());
//! clock.advance(Duration::minutes(2)); // now inside the daily downtime window
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use killfeed_ports::Clock;

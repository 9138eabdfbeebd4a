//! Killfeed Gateway
//!
//! Client for the upstream killmail API. Provides:
//! - Retried request execution with a per-attempt deadline
//! - Conditional (ETag) requests where 304 is a success outcome
//! - Error-budget and status-bucket telemetry for the health tracker
//! - Typed endpoints for killmails, server status and entity lookups
//!
//! ## Architecture
//!
//! ```text
//!  Importer / StatusPoller
//!         │ EsiRequest
//!    ┌────▼──────┐   attempt ≤ 3, 3s deadline, 2s backoff
//!    │ EsiClient │ ◄──────────────────────────────────────┐
//!    └────┬──────┘                                        │ 5xx / network
//!         │ (bytes, ResponseMeta)        ┌──────────┐     │
//!         ├─────────────────────────────►│ Upstream │─────┘
//!         │                              └──────────┘
//!         │ status bucket, error budget
//!    ┌────▼──────────┐
//!    │ TelemetrySink │  (health context)
//!    └───────────────┘
//! ```
//!
//! Ordinary HTTP failures never surface as `Err`; they come back inside
//! [`ResponseMeta`]. Only building the client itself can fail.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod paths;
pub mod request;
pub mod response;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use client::EsiClient;
pub use config::GatewayConfig;
pub use endpoints::{
    Alliance, Character, Conditional, Corporation, ServerStatus,
};
pub use error::GatewayError;
pub use paths::Paths;
pub use request::EsiRequest;
pub use response::{CacheDirectives, ResponseMeta};
pub use retry::{AttemptOutcome, RetryPolicy};

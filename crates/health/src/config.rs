//! Health tracker configuration

use crate::transition::AdmissionPolicy;
use std::time::Duration;

/// How the admission gate waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Re-check interval while blocked
    pub poll_interval: Duration,
    /// One-off delay applied to each caller while Yellow
    pub yellow_penalty: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            yellow_penalty: Duration::from_millis(250),
        }
    }
}

/// Configuration for the tracker loop
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How often transitions are evaluated
    pub poll_interval: Duration,
    pub policy: AdmissionPolicy,
    /// A load signal older than this counts as missing
    pub load_signal_max_age: chrono::Duration,
    /// Tracking entries older than this are pruned every tick
    pub tracking_retention: chrono::Duration,
    /// Window summarised in the per-tick tracking log line
    pub snapshot_window: chrono::Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            policy: AdmissionPolicy::default(),
            load_signal_max_age: chrono::Duration::seconds(120),
            tracking_retention: chrono::Duration::minutes(6),
            snapshot_window: chrono::Duration::minutes(1),
        }
    }
}

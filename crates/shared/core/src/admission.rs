use crate::values::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic-light admission state gating all ingestion work
///
/// Variants are ordered by severity, Green being the least severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum AdmissionState {
    /// Work proceeds immediately
    #[default]
    Green = 0,
    /// Work proceeds after a short penalty
    Yellow = 1,
    /// Work is halted until the error budget recovers
    Red = 2,
    /// Upstream is down or in its maintenance window
    Downtime = 3,
}

impl AdmissionState {
    /// Returns true if workers must wait before starting new work
    pub fn is_blocking(&self) -> bool {
        matches!(self, AdmissionState::Red | AdmissionState::Downtime)
    }

    /// Yellow or Red: degraded by error budget, not by downtime
    pub fn is_degraded(&self) -> bool {
        matches!(self, AdmissionState::Yellow | AdmissionState::Red)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionState::Green => "green",
            AdmissionState::Yellow => "yellow",
            AdmissionState::Red => "red",
            AdmissionState::Downtime => "downtime",
        }
    }
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream error budget as last reported in response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBudget {
    /// Errors the upstream will still tolerate before cutting us off
    pub remaining: i64,
    /// When the upstream resets the budget, if it said so
    pub reset_at: Option<Timestamp>,
    /// When this observation was published
    pub observed_at: Timestamp,
}

impl ErrorBudget {
    /// Value assumed when a response omits the remaining-budget header
    pub const DEFAULT_REMAINING: i64 = 15;

    pub fn new(remaining: i64, reset_at: Option<Timestamp>, observed_at: Timestamp) -> Self {
        Self {
            remaining,
            reset_at,
            observed_at,
        }
    }

    /// True once the published reset time lies strictly in the past
    pub fn has_reset(&self, now: Timestamp) -> bool {
        self.reset_at.is_some_and(|reset| now > reset)
    }
}

/// Upstream load signal: how many players are online, and whether the
/// cluster is restricted to VIP (maintenance) access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSignal {
    pub active_count: i64,
    pub maintenance: bool,
    pub observed_at: Timestamp,
}

impl LoadSignal {
    pub fn new(active_count: i64, maintenance: bool, observed_at: Timestamp) -> Self {
        Self {
            active_count,
            maintenance,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_admission_severity_order() {
        assert!(AdmissionState::Green < AdmissionState::Yellow);
        assert!(AdmissionState::Yellow < AdmissionState::Red);
        assert!(AdmissionState::Red < AdmissionState::Downtime);
        assert_eq!(AdmissionState::default(), AdmissionState::Green);
    }

    #[test]
    fn test_blocking_states() {
        assert!(!AdmissionState::Green.is_blocking());
        assert!(!AdmissionState::Yellow.is_blocking());
        assert!(AdmissionState::Red.is_blocking());
        assert!(AdmissionState::Downtime.is_blocking());
    }

    #[test]
    fn test_budget_reset() {
        let now = Utc::now();
        let budget = ErrorBudget::new(5, Some(now + Duration::seconds(30)), now);
        assert!(!budget.has_reset(now));
        assert!(budget.has_reset(now + Duration::seconds(31)));

        let unknown = ErrorBudget::new(5, None, now);
        assert!(!unknown.has_reset(now + Duration::days(1)));
    }
}

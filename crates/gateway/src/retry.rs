//! Retry policy for upstream calls

use crate::error::GatewayError;
use std::time::Duration;

/// What a single attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A response arrived with this status
    Status(u16),
    /// No response: connection failure, reset, timeout
    Failed(GatewayError),
}

/// Bounded retry with a fixed backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Transient failures and 5xx responses are retryable
    pub fn is_retryable(&self, outcome: &AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::Status(status) => {
                GatewayError::from_status(*status).is_some_and(|e| e.is_transient())
            }
            AttemptOutcome::Failed(err) => err.is_transient(),
        }
    }

    /// Whether attempt number `attempt` (1-based) should be followed by another
    pub fn should_retry(&self, attempt: u32, outcome: &AttemptOutcome) -> bool {
        attempt < self.max_attempts && self.is_retryable(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_retryable_outcomes() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&AttemptOutcome::Status(500)));
        assert!(policy.is_retryable(&AttemptOutcome::Status(504)));
        assert!(!policy.is_retryable(&AttemptOutcome::Status(404)));
        assert!(!policy.is_retryable(&AttemptOutcome::Status(420)));
        assert!(!policy.is_retryable(&AttemptOutcome::Status(200)));
        assert!(!policy.is_retryable(&AttemptOutcome::Status(302)));
        assert!(!policy.is_retryable(&AttemptOutcome::Status(600)));
        assert!(policy.is_retryable(&AttemptOutcome::Failed(GatewayError::Timeout(
            Duration::from_secs(3)
        ))));
        assert!(!policy.is_retryable(&AttemptOutcome::Failed(
            GatewayError::InvalidRequest("bad url".into())
        )));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        let outcome = AttemptOutcome::Status(503);
        assert!(policy.should_retry(1, &outcome));
        assert!(policy.should_retry(2, &outcome));
        assert!(!policy.should_retry(3, &outcome));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}

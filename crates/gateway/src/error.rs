//! Error types for the gateway crate

use std::time::Duration;
use thiserror::Error;

/// Outcome classification for a gateway call
///
/// Transport failures and timeouts are transient and retried; so are 5xx
/// responses until the attempt budget runs out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream server error: status {0}")]
    UpstreamServer(u16),

    #[error("Upstream rejected request: status {0}")]
    UpstreamClient(u16),

    #[error("Upstream error limit reached, cooling down")]
    RateLimitCooldown,

    #[error("max attempts exceeded after {attempts} attempts (last status {status})")]
    MaxAttemptsExceeded { attempts: u32, status: u16 },

    #[error("Unexpected status: {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl GatewayError {
    /// Errors worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_) | GatewayError::Timeout(_) | GatewayError::UpstreamServer(_)
        )
    }

    /// Classify the status of a single response
    ///
    /// Success (2xx) and 304 carry no error.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 | 304 => None,
            420 => Some(GatewayError::RateLimitCooldown),
            400..=499 => Some(GatewayError::UpstreamClient(status)),
            500..=599 => Some(GatewayError::UpstreamServer(status)),
            _ => Some(GatewayError::UnexpectedStatus(status)),
        }
    }

    /// Map the status that ended a call onto the error taxonomy
    ///
    /// A server error reaching this point has already used up its retries.
    pub fn from_terminal_status(status: u16, attempts: u32) -> Option<Self> {
        match Self::from_status(status)? {
            GatewayError::UpstreamServer(status) => {
                Some(GatewayError::MaxAttemptsExceeded { attempts, status })
            }
            other => Some(other),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            GatewayError::InvalidRequest(e.to_string())
        } else if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_mapping() {
        assert_eq!(GatewayError::from_terminal_status(200, 1), None);
        assert_eq!(GatewayError::from_terminal_status(304, 1), None);
        assert_eq!(
            GatewayError::from_terminal_status(420, 1),
            Some(GatewayError::RateLimitCooldown)
        );
        assert_eq!(
            GatewayError::from_terminal_status(422, 1),
            Some(GatewayError::UpstreamClient(422))
        );
        assert_eq!(
            GatewayError::from_terminal_status(502, 3),
            Some(GatewayError::MaxAttemptsExceeded {
                attempts: 3,
                status: 502
            })
        );
    }

    #[test]
    fn test_attempt_status_classification() {
        assert_eq!(GatewayError::from_status(204), None);
        assert_eq!(
            GatewayError::from_status(503),
            Some(GatewayError::UpstreamServer(503))
        );
        assert_eq!(
            GatewayError::from_status(404),
            Some(GatewayError::UpstreamClient(404))
        );
        assert_eq!(
            GatewayError::from_status(420),
            Some(GatewayError::RateLimitCooldown)
        );
        assert_eq!(
            GatewayError::from_status(302),
            Some(GatewayError::UnexpectedStatus(302))
        );
        assert!(GatewayError::from_status(500).is_some_and(|e| e.is_transient()));
    }

    #[test]
    fn test_transient_errors() {
        assert!(GatewayError::Transport("reset".into()).is_transient());
        assert!(GatewayError::Timeout(Duration::from_secs(3)).is_transient());
        assert!(GatewayError::UpstreamServer(503).is_transient());
        assert!(!GatewayError::UpstreamClient(404).is_transient());
        assert!(!GatewayError::RateLimitCooldown.is_transient());
    }
}

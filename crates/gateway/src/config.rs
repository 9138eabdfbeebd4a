//! Gateway client configuration

use crate::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net";
pub const DEFAULT_USER_AGENT: &str = "killfeed/0.1 (+https://github.com/l3p/killfeed)";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Scheme and host of the upstream API, without a trailing path
    pub base_url: String,
    /// Sent on every request
    pub user_agent: String,
    /// Deadline for a single attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(3),
            retry: RetryPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

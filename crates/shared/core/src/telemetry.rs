use serde::{Deserialize, Serialize};

/// Status-code bucket recorded for every terminal upstream response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusBucket {
    /// 200
    Ok,
    /// 304
    NotModified,
    /// 420, the upstream's "error limited" cooldown
    CalmDown,
    /// Any other 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusBucket {
    pub const ALL: [StatusBucket; 5] = [
        StatusBucket::Ok,
        StatusBucket::NotModified,
        StatusBucket::CalmDown,
        StatusBucket::ClientError,
        StatusBucket::ServerError,
    ];

    /// Classify a status code; other 2xx and 3xx codes are not tracked
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => Some(StatusBucket::Ok),
            304 => Some(StatusBucket::NotModified),
            420 => Some(StatusBucket::CalmDown),
            400..=499 => Some(StatusBucket::ClientError),
            500..=599 => Some(StatusBucket::ServerError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Ok => "200",
            StatusBucket::NotModified => "304",
            StatusBucket::CalmDown => "420",
            StatusBucket::ClientError => "4xx",
            StatusBucket::ServerError => "5xx",
        }
    }
}

//! Response header extraction and telemetry publishing

use chrono::{DateTime, Duration, Utc};
use killfeed_core::{ErrorBudget, StatusBucket, Timestamp};
use killfeed_ports::TelemetrySink;
use std::collections::HashMap;

pub const ERROR_LIMIT_REMAIN: &str = "x-esi-error-limit-remain";
pub const ERROR_LIMIT_RESET: &str = "x-esi-error-limit-reset";
pub const ETAG: &str = "etag";
pub const EXPIRES: &str = "expires";

/// Remaining error budget, or the conservative default when the header is
/// missing or garbled
pub fn error_limit_remain(headers: &HashMap<String, String>) -> i64 {
    headers
        .get(ERROR_LIMIT_REMAIN)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(ErrorBudget::DEFAULT_REMAINING)
}

/// Absolute budget reset time; the header carries seconds until reset
pub fn error_limit_reset(headers: &HashMap<String, String>, now: Timestamp) -> Option<Timestamp> {
    headers
        .get(ERROR_LIMIT_RESET)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| now + Duration::seconds(secs))
}

/// `Expires` as an HTTP date, or one hour from now
pub fn expires(headers: &HashMap<String, String>, now: Timestamp) -> Timestamp {
    headers
        .get(EXPIRES)
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::hours(1))
}

pub fn etag(headers: &HashMap<String, String>) -> Option<String> {
    headers.get(ETAG).cloned()
}

/// Report a terminal response to the health context
pub(crate) fn publish(
    sink: &dyn TelemetrySink,
    status: u16,
    headers: &HashMap<String, String>,
    now: Timestamp,
) {
    if let Some(bucket) = StatusBucket::from_status(status) {
        sink.record_status(bucket, now);
    }
    sink.record_error_budget(
        error_limit_remain(headers),
        error_limit_reset(headers, now),
        now,
    );
}

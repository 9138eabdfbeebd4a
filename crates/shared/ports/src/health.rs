use async_trait::async_trait;
use killfeed_core::{StatusBucket, Timestamp};

/// Receives per-response telemetry from the gateway client
///
/// Called synchronously on the response path, so implementations must not
/// block for long.
pub trait TelemetrySink: Send + Sync {
    /// Record the bucket of a terminal response
    fn record_status(&self, bucket: StatusBucket, at: Timestamp);

    /// Publish the error budget carried by a response
    fn record_error_budget(&self, remaining: i64, reset_at: Option<Timestamp>, at: Timestamp);
}

/// Admission check consulted by workers before each unit of work
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// Wait until work may proceed
    ///
    /// Blocks indefinitely while the upstream is unavailable, briefly while
    /// it is degraded, and returns immediately when healthy.
    async fn await_clearance(&self);
}

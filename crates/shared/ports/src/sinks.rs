use crate::error::BackupError;
use async_trait::async_trait;
use chrono::NaiveDate;
use killfeed_core::{Killmail, WorkItem};

/// Archive for raw upstream payloads
///
/// Best effort: callers log failures and carry on.
#[async_trait]
pub trait BackupSink: Send + Sync {
    async fn store(&self, date: NaiveDate, item: &WorkItem, raw: &[u8]) -> Result<(), BackupError>;
}

/// Downstream aggregation triggered for every newly stored killmail
#[async_trait]
pub trait StatsObserver: Send + Sync {
    async fn observe(&self, killmail: &Killmail);
}

use crate::error::StorageResult;
use async_trait::async_trait;
use killfeed_core::{DateRange, Killmail};

/// Result of an insert against a store with idempotent semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same id was already present; nothing changed
    Duplicate,
}

/// Selection criteria for killmail queries
///
/// Empty criteria match every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillmailFilter {
    pub range: Option<DateRange>,
    pub ids: Option<Vec<u64>>,
}

impl KillmailFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to records whose killmail time lies within `range`
    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Restrict to the given ids
    pub fn with_ids(mut self, ids: Vec<u64>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn matches(&self, killmail: &Killmail) -> bool {
        if let Some(range) = &self.range {
            if !range.contains(killmail.killmail_time) {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&killmail.id) {
                return false;
            }
        }
        true
    }
}

/// Killmail storage
#[async_trait]
pub trait KillmailRepository: Send + Sync {
    async fn exists(&self, id: u64) -> StorageResult<bool>;

    /// Insert a record; a duplicate id is reported, never raised
    async fn insert(&self, killmail: &Killmail) -> StorageResult<InsertOutcome>;

    async fn count_where(&self, filter: &KillmailFilter) -> StorageResult<u64>;

    async fn find_where(&self, filter: &KillmailFilter) -> StorageResult<Vec<Killmail>>;
}

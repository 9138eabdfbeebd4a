use crate::error::QueueResult;
use async_trait::async_trait;
use killfeed_core::WorkItem;

/// Durable ordered set of pending work items
///
/// Items are ordered by an integer score (insertion time in unix
/// nanoseconds). Pushing an item already present replaces its score.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Add an item with the given score
    async fn push(&self, item: &WorkItem, score: i64) -> QueueResult<()>;

    /// Atomically remove and return the lowest-scored item
    ///
    /// Two concurrent callers never receive the same item.
    async fn pop_min(&self) -> QueueResult<Option<WorkItem>>;

    /// Count items whose score lies in `[min, max]`
    async fn count_in_range(&self, min: i64, max: i64) -> QueueResult<u64>;

    /// Total number of pending items
    async fn len(&self) -> QueueResult<u64> {
        self.count_in_range(i64::MIN, i64::MAX).await
    }
}

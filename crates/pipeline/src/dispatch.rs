//! Enqueue entry point shared by the feed, manual inserts and backfill

use killfeed_core::WorkItem;
use killfeed_ports::{Clock, QueueResult, QueueStore};
use log::debug;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 250;

#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    pub fn queue(&self) -> &Arc<dyn QueueStore> {
        &self.queue
    }

    /// Ordering score for an item pushed now: unix nanoseconds
    fn score(&self) -> i64 {
        let now = self.clock.now();
        now.timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp().saturating_mul(1_000_000_000))
    }

    pub async fn dispatch(&self, item: &WorkItem) -> QueueResult<()> {
        self.queue.push(item, self.score()).await?;
        debug!("[dispatch] queued {}", item);
        Ok(())
    }

    /// Push `items` in chunks of `batch_size`, yielding between chunks
    pub async fn dispatch_batch(&self, items: &[WorkItem], batch_size: usize) -> QueueResult<usize> {
        let mut pushed = 0;
        for chunk in items.chunks(batch_size.max(1)) {
            let score = self.score();
            for item in chunk {
                self.queue.push(item, score).await?;
                pushed += 1;
            }
            debug!("[dispatch] queued batch of {} ({}/{})", chunk.len(), pushed, items.len());
            tokio::task::yield_now().await;
        }
        Ok(pushed)
    }
}

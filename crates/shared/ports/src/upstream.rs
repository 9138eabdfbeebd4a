use crate::error::{FetchError, LoadSignalError};
use async_trait::async_trait;
use killfeed_core::{LoadSignal, WorkItem};

/// Fetches the raw upstream payload for a work item
#[async_trait]
pub trait KillmailFetcher: Send + Sync {
    async fn fetch_killmail(&self, item: &WorkItem) -> Result<Vec<u8>, FetchError>;
}

/// Source of the upstream load signal (player count and VIP flag)
#[async_trait]
pub trait LoadSignalSource: Send + Sync {
    async fn load_signal(&self) -> Result<LoadSignal, LoadSignalError>;
}

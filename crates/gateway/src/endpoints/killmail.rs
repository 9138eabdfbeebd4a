use crate::client::EsiClient;
use crate::paths::Paths;
use crate::request::EsiRequest;
use crate::response::ResponseMeta;
use async_trait::async_trait;
use killfeed_core::WorkItem;
use killfeed_ports::{FetchError, KillmailFetcher};

impl EsiClient {
    /// Raw killmail payload for an id/hash pair
    pub async fn killmail(&self, id: u64, hash: &str) -> (Vec<u8>, ResponseMeta) {
        self.execute(&EsiRequest::get(Paths::killmail(id, hash)))
            .await
    }
}

#[async_trait]
impl KillmailFetcher for EsiClient {
    async fn fetch_killmail(&self, item: &WorkItem) -> Result<Vec<u8>, FetchError> {
        let (body, meta) = self.killmail(item.id, &item.hash).await;
        if let Some(err) = meta.error {
            return Err(FetchError::new(meta.status, err.to_string()));
        }
        if meta.status != 200 {
            return Err(FetchError::new(
                meta.status,
                format!("unexpected status {}", meta.status),
            ));
        }
        Ok(body)
    }
}

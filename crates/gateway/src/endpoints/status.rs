use crate::client::EsiClient;
use crate::error::GatewayError;
use crate::paths::Paths;
use crate::request::EsiRequest;
use crate::response::ResponseMeta;
use async_trait::async_trait;
use killfeed_core::{LoadSignal, Timestamp};
use killfeed_ports::{LoadSignalError, LoadSignalSource};
use serde::{Deserialize, Serialize};

/// Upstream cluster status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub players: i64,
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    /// Present and true while the cluster only admits VIP logins
    #[serde(default)]
    pub vip: Option<bool>,
}

impl EsiClient {
    pub async fn server_status(&self) -> Result<(ServerStatus, ResponseMeta), GatewayError> {
        let (body, meta) = self.execute(&EsiRequest::get(Paths::STATUS)).await;
        if let Some(err) = &meta.error {
            return Err(err.clone());
        }
        let status = serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok((status, meta))
    }
}

#[async_trait]
impl LoadSignalSource for EsiClient {
    async fn load_signal(&self) -> Result<LoadSignal, LoadSignalError> {
        let (status, _) = self
            .server_status()
            .await
            .map_err(|e| LoadSignalError(e.to_string()))?;
        Ok(LoadSignal::new(
            status.players,
            status.vip.unwrap_or(false),
            self.now(),
        ))
    }
}

use crate::client::EsiClient;
use crate::error::GatewayError;
use crate::paths::Paths;
use crate::request::EsiRequest;
use crate::response::CacheDirectives;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Result of a conditional fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    /// 200: new data, store it along with the cache directives
    Fresh { value: T, cache: CacheDirectives },
    /// 304: the stored copy is current, only refresh its expiry
    NotModified { cache: CacheDirectives },
}

impl<T> Conditional<T> {
    pub fn cache(&self) -> &CacheDirectives {
        match self {
            Conditional::Fresh { cache, .. } | Conditional::NotModified { cache } => cache,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Conditional::Fresh { value, .. } => Some(value),
            Conditional::NotModified { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub corporation_id: u64,
    #[serde(default)]
    pub alliance_id: Option<u64>,
    #[serde(default)]
    pub security_status: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corporation {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub alliance_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alliance {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub executor_corporation_id: Option<u64>,
}

impl EsiClient {
    /// GET `path`, sending `etag` as `If-None-Match` when present
    pub async fn fetch_conditional<T: DeserializeOwned>(
        &self,
        path: &str,
        etag: Option<&str>,
    ) -> Result<Conditional<T>, GatewayError> {
        let request = EsiRequest::get(path).with_etag(etag);
        let (body, meta) = self.execute(&request).await;
        if let Some(err) = &meta.error {
            return Err(err.clone());
        }

        let cache = meta.cache_directives(self.now());
        if meta.is_not_modified() {
            return Ok(Conditional::NotModified { cache });
        }
        let value = serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(Conditional::Fresh { value, cache })
    }

    pub async fn character(
        &self,
        id: u64,
        etag: Option<&str>,
    ) -> Result<Conditional<Character>, GatewayError> {
        self.fetch_conditional(&Paths::character(id), etag).await
    }

    pub async fn corporation(
        &self,
        id: u64,
        etag: Option<&str>,
    ) -> Result<Conditional<Corporation>, GatewayError> {
        self.fetch_conditional(&Paths::corporation(id), etag).await
    }

    pub async fn alliance(
        &self,
        id: u64,
        etag: Option<&str>,
    ) -> Result<Conditional<Alliance>, GatewayError> {
        self.fetch_conditional(&Paths::alliance(id), etag).await
    }
}

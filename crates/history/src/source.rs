//! Authoritative totals and per-day hash maps

use crate::error::{HistoryError, HistoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use killfeed_core::{WorkItem, format_day, parse_day};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const DEFAULT_HISTORY_URL: &str = "https://zkillboard.com";

/// Source of per-day killmail totals and id/hash listings
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Killmail count per day
    async fn totals(&self) -> HistoryResult<BTreeMap<NaiveDate, u64>>;

    /// Every killmail recorded for `date`, ordered by id
    async fn day(&self, date: NaiveDate) -> HistoryResult<Vec<WorkItem>>;
}

#[derive(Debug, Clone)]
pub struct HistoryClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HistoryClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HISTORY_URL.to_string(),
            user_agent: concat!("killfeed/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the zKillboard history API
pub struct ZkillHistoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl ZkillHistoryClient {
    pub fn new(config: HistoryClientConfig) -> HistoryResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| HistoryError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> HistoryResult<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(HistoryError::Status { status, url });
        }
        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(HistoryError::EmptyBody(url));
        }
        debug!("[history] GET {} ({} bytes)", url, body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl HistorySource for ZkillHistoryClient {
    async fn totals(&self) -> HistoryResult<BTreeMap<NaiveDate, u64>> {
        let body = self.get("/api/history/totals.json").await?;
        let raw: HashMap<String, u64> =
            serde_json::from_slice(&body).map_err(|e| HistoryError::Decode(e.to_string()))?;
        Ok(parse_totals(raw))
    }

    async fn day(&self, date: NaiveDate) -> HistoryResult<Vec<WorkItem>> {
        let body = self
            .get(&format!("/api/history/{}.json", format_day(date)))
            .await?;
        let raw: HashMap<String, String> =
            serde_json::from_slice(&body).map_err(|e| HistoryError::Decode(e.to_string()))?;
        parse_day_hashes(raw)
    }
}

/// Keys that are not `YYYYMMDD` dates are skipped
pub fn parse_totals(raw: HashMap<String, u64>) -> BTreeMap<NaiveDate, u64> {
    raw.into_iter()
        .filter_map(|(key, count)| match parse_day(&key) {
            Some(date) => Some((date, count)),
            None => {
                warn!("[history] ignoring totals key {:?}", key);
                None
            }
        })
        .collect()
}

pub fn parse_day_hashes(raw: HashMap<String, String>) -> HistoryResult<Vec<WorkItem>> {
    let mut items = raw
        .into_iter()
        .map(|(id, hash)| {
            id.parse::<u64>()
                .map(|id| WorkItem::new(id, hash))
                .map_err(|_| HistoryError::Decode(format!("invalid killmail id {:?}", id)))
        })
        .collect::<HistoryResult<Vec<_>>>()?;
    items.sort_by_key(|item| item.id);
    Ok(items)
}

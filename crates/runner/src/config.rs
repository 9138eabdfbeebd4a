//! Configuration loading for killfeed
//!
//! Everything has a default, so an absent or partial JSON file is fine.
//! Environment overrides are applied after the file:
//!
//! | variable                  | field               |
//! |---------------------------|---------------------|
//! | `KILLFEED_ESI_HOST`       | `esi.base_url`      |
//! | `KILLFEED_ESI_USER_AGENT` | `esi.user_agent`    |
//! | `KILLFEED_ZKB_USER_AGENT` | `history.user_agent`|
//! | `KILLFEED_DATABASE`       | `storage.database`  |
//! | `KILLFEED_BACKUP_DIR`     | `backup.dir` (and enables backups) |
//! | `KILLFEED_LOG_LEVEL`      | `log_level`         |

use killfeed_gateway::config::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use killfeed_gateway::{GatewayConfig, RetryPolicy};
use killfeed_health::{AdmissionPolicy, DowntimeWindow, GateConfig, TrackerConfig};
use killfeed_history::{DEFAULT_HISTORY_URL, HistoryClientConfig, ReconcileConfig};
use killfeed_pipeline::{FeedConfig, ImporterConfig, RunMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillfeedConfig {
    #[serde(default)]
    pub esi: EsiSection,
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub importer: ImporterSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub backup: BackupSection,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for KillfeedConfig {
    fn default() -> Self {
        Self {
            esi: EsiSection::default(),
            health: HealthSection::default(),
            importer: ImporterSection::default(),
            history: HistorySection::default(),
            feed: FeedSection::default(),
            storage: StorageSection::default(),
            backup: BackupSection::default(),
            log_level: default_log_level(),
        }
    }
}

impl KillfeedConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from `lookup`, normally the process environment
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("KILLFEED_ESI_HOST") {
            self.esi.base_url = v;
        }
        if let Some(v) = lookup("KILLFEED_ESI_USER_AGENT") {
            self.esi.user_agent = v;
        }
        if let Some(v) = lookup("KILLFEED_ZKB_USER_AGENT") {
            self.history.user_agent = v;
        }
        if let Some(v) = lookup("KILLFEED_DATABASE") {
            self.storage.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("KILLFEED_BACKUP_DIR") {
            self.backup.dir = PathBuf::from(v);
            self.backup.enabled = true;
        }
        if let Some(v) = lookup("KILLFEED_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.health.downtime_window()?;
        if self.importer.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "importer.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.esi.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "esi.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::default()
            .with_base_url(self.esi.base_url.clone())
            .with_user_agent(self.esi.user_agent.clone())
            .with_timeout(self.esi.timeout())
            .with_retry(RetryPolicy::new(self.esi.max_attempts, self.esi.retry_backoff()))
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            poll_interval: self.health.poll_interval(),
            yellow_penalty: self.health.yellow_penalty(),
        }
    }

    pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        Ok(TrackerConfig {
            poll_interval: self.health.poll_interval(),
            policy: AdmissionPolicy {
                min_active_count: self.health.min_active_count,
                window: self.health.downtime_window()?,
            },
            load_signal_max_age: chrono::Duration::seconds(
                self.health.load_signal_max_age_secs as i64,
            ),
            tracking_retention: chrono::Duration::seconds(
                self.health.tracking_retention_secs as i64,
            ),
            ..TrackerConfig::default()
        })
    }

    pub fn importer_config(&self, mode: RunMode) -> ImporterConfig {
        ImporterConfig {
            max_concurrency: self.importer.max_concurrency,
            spacing: self.importer.spacing(),
            idle_wait: self.importer.idle_wait(),
            mode,
        }
    }

    pub fn history_client_config(&self) -> HistoryClientConfig {
        HistoryClientConfig {
            base_url: self.history.base_url.clone(),
            user_agent: self.history.user_agent.clone(),
            ..HistoryClientConfig::default()
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            day_attempts: self.history.day_attempts,
            day_backoff: Duration::from_millis(self.history.day_backoff_ms),
            max_missing_dates: self.history.max_missing_dates,
            date_passes: self.history.date_passes,
            drain_poll: Duration::from_millis(self.history.drain_poll_ms),
            enqueue_batch: self.history.enqueue_batch,
            pause: Duration::from_millis(self.history.pause_ms),
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed.url.clone(),
            channel: self.feed.channel.clone(),
            reconnect_delay: Duration::from_millis(self.feed.reconnect_delay_ms),
        }
    }
}

/// Upstream killmail API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsiSection {
    #[serde(default = "default_esi_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_esi_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

impl Default for EsiSection {
    fn default() -> Self {
        Self {
            base_url: default_esi_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl EsiSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_yellow_penalty_ms")]
    pub yellow_penalty_ms: u64,
    #[serde(default = "default_min_active_count")]
    pub min_active_count: i64,
    /// `HH:MM`, UTC
    #[serde(default = "default_downtime_start")]
    pub downtime_start: String,
    #[serde(default = "default_downtime_end")]
    pub downtime_end: String,
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
    #[serde(default = "default_load_signal_max_age_secs")]
    pub load_signal_max_age_secs: u64,
    #[serde(default = "default_tracking_retention_secs")]
    pub tracking_retention_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_yellow_penalty_ms() -> u64 {
    250
}

fn default_min_active_count() -> i64 {
    100
}

fn default_downtime_start() -> String {
    "10:58".to_string()
}

fn default_downtime_end() -> String {
    "11:25".to_string()
}

fn default_status_poll_interval_ms() -> u64 {
    30_000
}

fn default_load_signal_max_age_secs() -> u64 {
    120
}

fn default_tracking_retention_secs() -> u64 {
    360
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            yellow_penalty_ms: default_yellow_penalty_ms(),
            min_active_count: default_min_active_count(),
            downtime_start: default_downtime_start(),
            downtime_end: default_downtime_end(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            load_signal_max_age_secs: default_load_signal_max_age_secs(),
            tracking_retention_secs: default_tracking_retention_secs(),
        }
    }
}

impl HealthSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn yellow_penalty(&self) -> Duration {
        Duration::from_millis(self.yellow_penalty_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn downtime_window(&self) -> Result<DowntimeWindow, ConfigError> {
        DowntimeWindow::parse(&self.downtime_start, &self.downtime_end)
            .map_err(|e| ConfigError::Invalid(format!("health downtime window: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImporterSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_spacing_ms")]
    pub spacing_ms: u64,
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,
}

fn default_max_concurrency() -> usize {
    10
}

fn default_spacing_ms() -> u64 {
    50
}

fn default_idle_wait_ms() -> u64 {
    2000
}

impl Default for ImporterSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            spacing_ms: default_spacing_ms(),
            idle_wait_ms: default_idle_wait_ms(),
        }
    }
}

impl ImporterSection {
    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

/// Totals and per-day listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_history_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_day_attempts")]
    pub day_attempts: u32,
    #[serde(default = "default_day_backoff_ms")]
    pub day_backoff_ms: u64,
    #[serde(default = "default_max_missing_dates")]
    pub max_missing_dates: u32,
    #[serde(default = "default_date_passes")]
    pub date_passes: u32,
    #[serde(default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,
    #[serde(default = "default_enqueue_batch")]
    pub enqueue_batch: usize,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

fn default_history_base_url() -> String {
    DEFAULT_HISTORY_URL.to_string()
}

fn default_day_attempts() -> u32 {
    3
}

fn default_day_backoff_ms() -> u64 {
    10_000
}

fn default_max_missing_dates() -> u32 {
    3
}

fn default_date_passes() -> u32 {
    2
}

fn default_drain_poll_ms() -> u64 {
    1000
}

fn default_enqueue_batch() -> usize {
    250
}

fn default_pause_ms() -> u64 {
    500
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            base_url: default_history_base_url(),
            user_agent: default_user_agent(),
            day_attempts: default_day_attempts(),
            day_backoff_ms: default_day_backoff_ms(),
            max_missing_dates: default_max_missing_dates(),
            date_passes: default_date_passes(),
            drain_poll_ms: default_drain_poll_ms(),
            enqueue_batch: default_enqueue_batch(),
            pause_ms: default_pause_ms(),
        }
    }
}

/// Live websocket feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSection {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_feed_channel")]
    pub channel: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_feed_url() -> String {
    killfeed_pipeline::feed::DEFAULT_FEED_URL.to_string()
}

fn default_feed_channel() -> String {
    killfeed_pipeline::feed::DEFAULT_CHANNEL.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            channel: default_feed_channel(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("killfeed.db")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_backup_dir(),
        }
    }
}

//! Component wiring
//!
//! One shared health context, one gateway client and one SQLite store back
//! every command. Background loops share a single shutdown signal.

use crate::config::{ConfigError, KillfeedConfig};
use chrono::NaiveDate;
use killfeed_clock::SystemClock;
use killfeed_core::WorkItem;
use killfeed_gateway::{EsiClient, GatewayError};
use killfeed_health::{HealthContext, HealthTracker, StatusPoller};
use killfeed_history::{
    HistoryError, ReconcileError, ReconcileReport, ReconcileRequest, Reconciler,
    ZkillHistoryClient,
};
use killfeed_pipeline::{Dispatcher, FeedListener, ImportSummary, Importer, ImporterConfig, RunMode};
use killfeed_ports::{Clock, QueueError, StorageError};
use killfeed_store::{DailyTally, DirectoryBackup, SqliteStore};
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("History source error: {0}")]
    History(#[from] HistoryError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

pub struct App {
    config: KillfeedConfig,
    clock: Arc<dyn Clock>,
    health: Arc<HealthContext>,
    esi: Arc<EsiClient>,
    store: Arc<SqliteStore>,
    backup: Option<Arc<DirectoryBackup>>,
    stats: Arc<DailyTally>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl App {
    pub fn build(config: KillfeedConfig) -> AppResult<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let health = HealthContext::new(config.gate_config());
        let esi = Arc::new(EsiClient::new(
            config.gateway_config(),
            health.clone(),
            clock.clone(),
        )?);
        let store = Arc::new(SqliteStore::open(&config.storage.database)?);
        let backup = config
            .backup
            .enabled
            .then(|| Arc::new(DirectoryBackup::new(config.backup.dir.clone())));
        let (shutdown, _) = watch::channel(false);

        info!(
            "[app] storage {}, backups {}",
            config.storage.database.display(),
            if config.backup.enabled {
                config.backup.dir.display().to_string()
            } else {
                "disabled".to_string()
            }
        );

        Ok(Self {
            config,
            clock,
            health,
            esi,
            store,
            backup,
            stats: Arc::new(DailyTally::new()),
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn config(&self) -> &KillfeedConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        self.store.clone()
    }

    pub fn stats(&self) -> Arc<DailyTally> {
        self.stats.clone()
    }

    pub fn health(&self) -> Arc<HealthContext> {
        self.health.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Sender side of the shutdown signal, for Ctrl-C handlers
    pub fn shutdown_trigger(&self) -> Arc<watch::Sender<bool>> {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.store.clone(), self.clock.clone())
    }

    pub fn importer(&self, config: ImporterConfig) -> Importer {
        let mut importer = Importer::new(
            self.store.clone(),
            self.store.clone(),
            self.esi.clone(),
            self.health.clone(),
            config,
        )
        .with_stats(self.stats.clone());
        if let Some(backup) = &self.backup {
            importer = importer.with_backup(backup.clone());
        }
        importer
    }

    /// Health tracker and status poller
    pub fn spawn_health(&self) -> AppResult<Vec<JoinHandle<()>>> {
        let tracker = HealthTracker::new(
            self.health.clone(),
            self.clock.clone(),
            self.config.tracker_config()?,
        );
        let poller = StatusPoller::new(
            self.esi.clone(),
            self.health.clone(),
            self.config.health.status_poll_interval(),
        );
        Ok(vec![
            tokio::spawn(tracker.run(self.shutdown_signal())),
            tokio::spawn(poller.run(self.shutdown_signal())),
        ])
    }

    /// Tracker and poller only, until shutdown
    pub async fn tracking(&self) -> AppResult<()> {
        let handles = self.spawn_health()?;
        join_all(handles).await;
        Ok(())
    }

    /// Health loops plus the importer
    pub async fn import(&self, config: ImporterConfig) -> AppResult<ImportSummary> {
        let handles = self.spawn_health()?;
        let summary = self.importer(config).run(self.shutdown_signal()).await;
        self.shutdown();
        join_all(handles).await;
        Ok(summary)
    }

    /// Health loops, live feed and a service-mode importer until shutdown
    pub async fn serve(&self) -> AppResult<ImportSummary> {
        let mut handles = self.spawn_health()?;
        let feed = FeedListener::new(self.config.feed_config(), self.dispatcher());
        let signal = self.shutdown_signal();
        handles.push(tokio::spawn(async move { feed.run(signal).await }));

        let summary = self
            .importer(self.config.importer_config(RunMode::Service))
            .run(self.shutdown_signal())
            .await;
        self.shutdown();
        join_all(handles).await;
        Ok(summary)
    }

    /// Queue items by hand
    pub async fn add(&self, items: &[WorkItem]) -> AppResult<usize> {
        let dispatcher = self.dispatcher();
        for item in items {
            dispatcher.dispatch(item).await?;
            info!("[app] queued {}", item);
        }
        Ok(items.len())
    }

    /// Run the reconciliation driver alongside a service-mode importer
    ///
    /// Everything stops once the driver returns.
    pub async fn history(&self, request: &ReconcileRequest) -> AppResult<ReconcileReport> {
        let source = Arc::new(ZkillHistoryClient::new(self.config.history_client_config())?);
        let mut reconciler = Reconciler::new(
            source,
            self.store.clone(),
            self.dispatcher(),
            self.config.reconcile_config(),
        );

        let mut handles = Vec::new();
        if !request.stats_only {
            handles = self.spawn_health()?;
            let importer = self.importer(self.config.importer_config(RunMode::Service));
            reconciler = reconciler.with_in_flight(importer.in_flight());
            let signal = self.shutdown_signal();
            handles.push(tokio::spawn(async move {
                let summary = importer.run(signal).await;
                info!(
                    "[app] importer stopped: {} imported, {} skipped, {} dropped",
                    summary.imported, summary.skipped, summary.dropped
                );
            }));
        }

        let result = reconciler.run(request, self.shutdown_signal()).await;
        self.shutdown();
        join_all(handles).await;
        Ok(result?)
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("[app] background task failed: {}", e);
        }
    }
}

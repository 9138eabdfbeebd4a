//! Bounded-concurrency importer
//!
//! Pops work items off the queue and runs each one as its own task:
//!
//! ```text
//! await_clearance ──► pop_min ──► exists? ──yes──► skipped
//!                                  │ no
//!                                  ▼
//!                                fetch ──► decode ──► insert ──► backup ──► stats
//!                                  │          │
//!                                  └──────────┴──► dropped (logged, not re-queued)
//! ```
//!
//! At most `max_concurrency` items are in flight. When every slot is taken
//! the loop waits `spacing` before trying again. The admission gate is
//! awaited before each pop, so a blocked gate leaves work in the queue and
//! shutdown still interrupts the wait.

use crate::error::{PipelineError, PipelineResult};
use crate::normalize;
use killfeed_core::WorkItem;
use killfeed_ports::{
    AdmissionGate, BackupSink, InsertOutcome, KillmailFetcher, KillmailRepository, QueueStore,
    StatsObserver,
};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

/// How the importer treats an empty queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Idle and poll again until shutdown
    #[default]
    Service,
    /// Stop once the queue stays empty across one idle interval
    Drain,
}

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub max_concurrency: usize,
    pub spacing: Duration,
    pub idle_wait: Duration,
    pub mode: RunMode,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            spacing: Duration::from_millis(50),
            idle_wait: Duration::from_secs(2),
            mode: RunMode::Service,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
    pub dropped: u64,
}

impl ImportSummary {
    pub fn processed(&self) -> u64 {
        self.imported + self.skipped + self.dropped
    }
}

/// Outcome of one successfully handled item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Imported,
    /// Already stored; nothing fetched or written
    Skipped,
}

/// Items taken off the queue whose handling has not finished yet
///
/// Cloned handles share one count.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicU64>);

impl InFlight {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Counters {
    imported: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
}

/// Per-item work, shared by every spawned task
struct Worker {
    repo: Arc<dyn KillmailRepository>,
    fetcher: Arc<dyn KillmailFetcher>,
    backup: Option<Arc<dyn BackupSink>>,
    stats: Option<Arc<dyn StatsObserver>>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn handle(&self, item: WorkItem) {
        match self.import(&item).await {
            Ok(ItemOutcome::Imported) => {
                self.counters.imported.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ItemOutcome::Skipped) => {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(PipelineError::Fetch(e)) if e.is_invalid_hash() => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("[importer] dropped {}: invalid hash", item);
            }
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("[importer] dropped {}: {}", item, e);
            }
        }
    }

    async fn import(&self, item: &WorkItem) -> PipelineResult<ItemOutcome> {
        if self.repo.exists(item.id).await? {
            debug!("[importer] skipping existing killmail {}", item);
            return Ok(ItemOutcome::Skipped);
        }

        let raw = self.fetcher.fetch_killmail(item).await?;
        let killmail = normalize::decode(&raw, item)?;

        if self.repo.insert(&killmail).await? == InsertOutcome::Duplicate {
            debug!("[importer] {} stored concurrently, skipping", item);
            return Ok(ItemOutcome::Skipped);
        }

        if let Some(backup) = &self.backup {
            let date = killmail.killmail_time.date_naive();
            if let Err(e) = backup.store(date, item, &raw).await {
                warn!("[importer] backup of {} failed: {}", item, e);
            }
        }
        if let Some(stats) = &self.stats {
            stats.observe(&killmail).await;
        }

        info!(
            "[importer] imported {} ({})",
            item,
            killmail.killmail_time.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(ItemOutcome::Imported)
    }
}

pub struct Importer {
    queue: Arc<dyn QueueStore>,
    repo: Arc<dyn KillmailRepository>,
    fetcher: Arc<dyn KillmailFetcher>,
    gate: Arc<dyn AdmissionGate>,
    backup: Option<Arc<dyn BackupSink>>,
    stats: Option<Arc<dyn StatsObserver>>,
    counters: Arc<Counters>,
    in_flight: InFlight,
    config: ImporterConfig,
}

impl Importer {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        repo: Arc<dyn KillmailRepository>,
        fetcher: Arc<dyn KillmailFetcher>,
        gate: Arc<dyn AdmissionGate>,
        config: ImporterConfig,
    ) -> Self {
        Self {
            queue,
            repo,
            fetcher,
            gate,
            backup: None,
            stats: None,
            counters: Arc::new(Counters::default()),
            in_flight: InFlight::default(),
            config,
        }
    }

    pub fn with_backup(mut self, backup: Arc<dyn BackupSink>) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn StatsObserver>) -> Self {
        self.stats = Some(stats);
        self
    }

    fn worker(&self) -> Worker {
        Worker {
            repo: Arc::clone(&self.repo),
            fetcher: Arc::clone(&self.fetcher),
            backup: self.backup.clone(),
            stats: self.stats.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Totals since construction
    pub fn summary(&self) -> ImportSummary {
        let counters = &self.counters;
        ImportSummary {
            imported: counters.imported.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Shared count of popped items still being handled
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Process a single item inline, bypassing the queue
    pub async fn process(&self, item: WorkItem) {
        self.gate.await_clearance().await;
        self.worker().handle(item).await;
    }

    /// Drain the queue until shutdown, or until empty in [`RunMode::Drain`]
    ///
    /// In-flight items always finish before this returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ImportSummary {
        let worker = Arc::new(self.worker());
        let slots = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut was_idle = false;

        info!(
            "[importer] started ({:?}, {} workers, {:?} spacing)",
            self.config.mode, self.config.max_concurrency, self.config.spacing
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    error!("[importer] worker task failed: {}", e);
                }
            }

            let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
                if pause(self.config.spacing, &mut shutdown).await {
                    break;
                }
                continue;
            };

            if hold_for_clearance(self.gate.as_ref(), &mut shutdown).await {
                drop(permit);
                break;
            }

            // Counted before the pop so the item is never invisible to both
            // the queue length and the in-flight count
            self.in_flight.enter();
            match self.queue.pop_min().await {
                Ok(Some(item)) => {
                    was_idle = false;
                    let worker = Arc::clone(&worker);
                    let in_flight = self.in_flight.clone();
                    tasks.spawn(async move {
                        worker.handle(item).await;
                        in_flight.leave();
                        drop(permit);
                    });
                }
                Ok(None) => {
                    self.in_flight.leave();
                    drop(permit);
                    let settled = tasks.is_empty();
                    if self.config.mode == RunMode::Drain && settled && was_idle {
                        info!("[importer] queue drained");
                        break;
                    }
                    was_idle = settled;
                    debug!("[importer] queue empty, {} in flight", tasks.len());
                    if pause(self.config.idle_wait, &mut shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    self.in_flight.leave();
                    drop(permit);
                    error!("[importer] unable to pop from queue: {}", e);
                    if pause(self.config.idle_wait, &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("[importer] worker task failed: {}", e);
            }
        }

        let summary = self.summary();
        info!(
            "[importer] stopped: {} imported, {} skipped, {} dropped",
            summary.imported, summary.skipped, summary.dropped
        );
        summary
    }
}

/// Wait for the admission gate; true if shutdown was requested first
async fn hold_for_clearance(
    gate: &dyn AdmissionGate,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            _ = gate.await_clearance() => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

/// Sleep for `duration`; true if shutdown was requested meanwhile
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

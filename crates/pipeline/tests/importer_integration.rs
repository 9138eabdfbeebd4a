//! Integration tests for the importer
//!
//! Runs the worker pool against in-memory adapters and a scripted fetcher:
//! - Queue to storage round trip with backup and stats side effects
//! - Idempotent skip of stored killmails
//! - Duplicate deliveries and dropped failures
//! - Concurrency bound and run modes

use async_trait::async_trait;
use chrono::NaiveDate;
use killfeed_core::WorkItem;
use killfeed_pipeline::{ImportSummary, Importer, ImporterConfig, RunMode};
use killfeed_ports::{
    AdmissionGate, BackupError, BackupSink, FetchError, KillmailFetcher, KillmailRepository,
    QueueStore,
};
use killfeed_store::{DailyTally, InMemoryKillmailRepository, InMemoryQueue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// Test Fixtures
// ============================================================================

fn payload(id: u64) -> Vec<u8> {
    format!(
        r#"{{
            "killmail_id": {id},
            "killmail_time": "2024-01-01T12:30:00Z",
            "solar_system_id": 30000142,
            "victim": {{"corporation_id": 98000001, "damage_taken": 900, "ship_type_id": 587}},
            "attackers": [{{"corporation_id": 98000002, "final_blow": true}}]
        }}"#
    )
    .into_bytes()
}

#[derive(Default)]
struct ScriptedFetcher {
    failures: HashMap<u64, u16>,
    delay: Option<Duration>,
    calls: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    fn calls(&self) -> Vec<u64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KillmailFetcher for ScriptedFetcher {
    async fn fetch_killmail(&self, item: &WorkItem) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().push(item.id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.get(&item.id) {
            Some(status) => Err(FetchError::new(*status, "scripted failure")),
            None => Ok(payload(item.id)),
        }
    }
}

#[derive(Default)]
struct CountingGate {
    calls: AtomicUsize,
}

#[async_trait]
impl AdmissionGate for CountingGate {
    async fn await_clearance(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingBackup {
    stored: Mutex<Vec<(NaiveDate, WorkItem, Vec<u8>)>>,
}

#[async_trait]
impl BackupSink for RecordingBackup {
    async fn store(&self, date: NaiveDate, item: &WorkItem, raw: &[u8]) -> Result<(), BackupError> {
        self.stored.lock().push((date, item.clone(), raw.to_vec()));
        Ok(())
    }
}

/// Gate stuck in Red or Downtime
struct ClosedGate;

#[async_trait]
impl AdmissionGate for ClosedGate {
    async fn await_clearance(&self) {
        std::future::pending::<()>().await
    }
}

struct Harness {
    queue: Arc<InMemoryQueue>,
    repo: Arc<InMemoryKillmailRepository>,
    fetcher: Arc<ScriptedFetcher>,
    gate: Arc<CountingGate>,
    backup: Arc<RecordingBackup>,
    stats: Arc<DailyTally>,
}

impl Harness {
    fn new(fetcher: ScriptedFetcher) -> Self {
        Self {
            queue: Arc::new(InMemoryQueue::new()),
            repo: Arc::new(InMemoryKillmailRepository::new()),
            fetcher: Arc::new(fetcher),
            gate: Arc::new(CountingGate::default()),
            backup: Arc::new(RecordingBackup::default()),
            stats: Arc::new(DailyTally::new()),
        }
    }

    fn importer(&self, max_concurrency: usize, mode: RunMode) -> Importer {
        self.importer_with_gate(self.gate.clone(), max_concurrency, mode)
    }

    fn importer_with_gate(
        &self,
        gate: Arc<dyn AdmissionGate>,
        max_concurrency: usize,
        mode: RunMode,
    ) -> Importer {
        let config = ImporterConfig {
            max_concurrency,
            spacing: Duration::from_millis(5),
            idle_wait: Duration::from_millis(20),
            mode,
        };
        Importer::new(
            self.queue.clone(),
            self.repo.clone(),
            self.fetcher.clone(),
            gate,
            config,
        )
        .with_backup(self.backup.clone())
        .with_stats(self.stats.clone())
    }

    async fn drain(&self, max_concurrency: usize) -> ImportSummary {
        let (_tx, rx) = watch::channel(false);
        self.importer(max_concurrency, RunMode::Drain).run(rx).await
    }
}

// ============================================================================
// Round Trip
// ============================================================================

#[tokio::test]
async fn test_queue_to_storage_round_trip() {
    let h = Harness::new(ScriptedFetcher::default());
    h.queue.push(&WorkItem::new(123, "abc"), 1).await.unwrap();

    let summary = h.drain(4).await;

    assert_eq!(summary, ImportSummary { imported: 1, skipped: 0, dropped: 0 });
    assert_eq!(h.repo.get(123).map(|k| k.hash), Some("abc".to_string()));
    assert_eq!(h.queue.len().await.unwrap(), 0);

    let stored = h.backup.stored.lock();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(stored[0].1, WorkItem::new(123, "abc"));
    assert_eq!(stored[0].2, payload(123));

    assert_eq!(h.stats.total(), 1);
    assert!(h.gate.calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_stored_killmail_is_never_fetched() {
    let h = Harness::new(ScriptedFetcher::default());
    h.queue.push(&WorkItem::new(5, "e"), 1).await.unwrap();
    h.drain(1).await;
    assert_eq!(h.fetcher.calls(), vec![5]);

    h.queue.push(&WorkItem::new(5, "e"), 2).await.unwrap();
    let summary = h.drain(1).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(h.fetcher.calls(), vec![5]);
    assert_eq!(h.backup.stored.lock().len(), 1);
}

#[tokio::test]
async fn test_duplicate_delivery_stores_once() {
    let h = Harness::new(ScriptedFetcher {
        delay: Some(Duration::from_millis(10)),
        ..Default::default()
    });
    let item = WorkItem::new(77, "same");
    h.queue.push(&item, 1).await.unwrap();
    h.queue.push(&item, 2).await.unwrap();
    h.queue.push(&WorkItem::new(77, "other-hash"), 3).await.unwrap();

    let summary = h.drain(4).await;

    assert_eq!(h.repo.len(), 1);
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.processed(), 2);
    assert_eq!(h.stats.total(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_fetch_is_dropped_not_requeued() {
    let h = Harness::new(ScriptedFetcher {
        failures: HashMap::from([(9, 422), (10, 503)]),
        ..Default::default()
    });
    for id in [9, 10, 11] {
        h.queue.push(&WorkItem::new(id, "h"), id as i64).await.unwrap();
    }

    let summary = h.drain(2).await;

    assert_eq!(summary, ImportSummary { imported: 1, skipped: 0, dropped: 2 });
    assert_eq!(h.queue.len().await.unwrap(), 0);
    assert!(!h.repo.exists(9).await.unwrap());
    assert!(!h.repo.exists(10).await.unwrap());
    assert!(h.repo.exists(11).await.unwrap());
    assert_eq!(h.backup.stored.lock().len(), 1);
}

// ============================================================================
// Concurrency & Run Modes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_in_flight_fetches_are_bounded() {
    let h = Harness::new(ScriptedFetcher {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    for id in 0..12u64 {
        h.queue.push(&WorkItem::new(id, "h"), id as i64).await.unwrap();
    }

    let summary = h.drain(3).await;

    assert_eq!(summary.imported, 12);
    assert!(h.fetcher.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert!(h.fetcher.max_in_flight.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_service_mode_idles_until_shutdown() {
    let h = Harness::new(ScriptedFetcher::default());
    let importer = Arc::new(h.importer(2, RunMode::Service));
    let (tx, rx) = watch::channel(false);

    let handle = {
        let importer = importer.clone();
        tokio::spawn(async move { importer.run(rx).await })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!handle.is_finished());

    // Work arriving later is still picked up
    h.queue.push(&WorkItem::new(1, "late"), 1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.repo.exists(1).await.unwrap());

    tx.send(true).unwrap();
    let summary = handle.await.unwrap();
    assert_eq!(summary.imported, 1);
}

// ============================================================================
// Admission Gate
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_gate_closed_keeps_item_queued() {
    let h = Harness::new(ScriptedFetcher::default());
    h.queue.push(&WorkItem::new(1, "a"), 1).await.unwrap();
    let importer = Arc::new(h.importer_with_gate(Arc::new(ClosedGate), 2, RunMode::Service));
    let (tx, rx) = watch::channel(false);

    let handle = {
        let importer = importer.clone();
        tokio::spawn(async move { importer.run(rx).await })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!handle.is_finished());
    assert_eq!(importer.in_flight().get(), 0);

    tx.send(true).unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(60), handle)
        .await
        .expect("run returns on shutdown while the gate is closed")
        .unwrap();

    assert_eq!(summary.processed(), 0);
    assert_eq!(h.queue.len().await.unwrap(), 1);
    assert!(h.fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_counts_items_being_handled() {
    let h = Harness::new(ScriptedFetcher {
        delay: Some(Duration::from_secs(10)),
        ..Default::default()
    });
    for id in [1, 2] {
        h.queue.push(&WorkItem::new(id, "h"), id as i64).await.unwrap();
    }
    let importer = Arc::new(h.importer(4, RunMode::Service));
    let in_flight = importer.in_flight();
    let (tx, rx) = watch::channel(false);

    let handle = {
        let importer = importer.clone();
        tokio::spawn(async move { importer.run(rx).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.queue.len().await.unwrap(), 0);
    assert_eq!(in_flight.get(), 2);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(in_flight.get(), 0);
    assert_eq!(h.repo.len(), 2);

    tx.send(true).unwrap();
    handle.await.unwrap();
}

//! Reconciliation driver
//!
//! For every date in the requested range:
//!
//! ```text
//! totals[date]? ──no──► skip (abort after N consecutive misses)
//!      │ yes
//!      ▼
//! local >= total? ──yes──► done
//!      │ no
//!      ▼
//! fetch day map ──► diff against stored ids ──► enqueue missing
//!      ▲                                             │
//!      └──── short and passes left ◄── recount ◄── wait for queue to drain
//! ```

use crate::error::{ReconcileError, ReconcileResult};
use crate::source::HistorySource;
use chrono::{Days, NaiveDate};
use killfeed_core::{DateRange, WorkItem};
use killfeed_pipeline::{Dispatcher, InFlight};
use killfeed_ports::{KillmailFilter, KillmailRepository};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "asc" => Ok(Direction::Forward),
            "backward" | "desc" => Ok(Direction::Backward),
            other => Err(format!("unknown direction {:?}", other)),
        }
    }
}

/// Dates between `start` and `end` inclusive, in walking order
pub fn walk(start: NaiveDate, end: NaiveDate, direction: Direction) -> Vec<NaiveDate> {
    let (low, high) = if start <= end { (start, end) } else { (end, start) };
    let mut dates: Vec<NaiveDate> = low.iter_days().take_while(|d| *d <= high).collect();
    if direction == Direction::Backward {
        dates.reverse();
    }
    dates
}

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub day_attempts: u32,
    pub day_backoff: Duration,
    /// Consecutive dates absent from totals before the walk aborts
    pub max_missing_dates: u32,
    pub date_passes: u32,
    pub drain_poll: Duration,
    pub enqueue_batch: usize,
    /// Pause between dates
    pub pause: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            day_attempts: 3,
            day_backoff: Duration::from_secs(10),
            max_missing_dates: 3,
            date_passes: 2,
            drain_poll: Duration::from_secs(1),
            enqueue_batch: 250,
            pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub direction: Direction,
    /// Compare counts only; never enqueue
    pub stats_only: bool,
}

impl ReconcileRequest {
    /// Reconcile a single day
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            direction: Direction::Forward,
            stats_only: false,
        }
    }

    /// The day before `today`
    pub fn yesterday(today: NaiveDate) -> Self {
        Self::day(today.checked_sub_days(Days::new(1)).unwrap_or(today))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub total: u64,
    pub local_before: u64,
    pub local_after: u64,
    pub enqueued: u64,
    pub passes: u32,
}

impl DayReport {
    pub fn is_complete(&self) -> bool {
        self.local_after >= self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub days: Vec<DayReport>,
    /// Dates absent from totals
    pub skipped: Vec<NaiveDate>,
}

impl ReconcileReport {
    pub fn enqueued(&self) -> u64 {
        self.days.iter().map(|d| d.enqueued).sum()
    }

    /// Total shortfall across visited days after reconciliation
    pub fn missing(&self) -> u64 {
        self.days
            .iter()
            .map(|d| d.total.saturating_sub(d.local_after))
            .sum()
    }
}

pub struct Reconciler {
    source: Arc<dyn HistorySource>,
    repo: Arc<dyn KillmailRepository>,
    dispatcher: Dispatcher,
    in_flight: Option<InFlight>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn HistorySource>,
        repo: Arc<dyn KillmailRepository>,
        dispatcher: Dispatcher,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            source,
            repo,
            dispatcher,
            in_flight: None,
            config,
        }
    }

    /// Track the importer's in-flight items while waiting for a drain
    pub fn with_in_flight(mut self, in_flight: InFlight) -> Self {
        self.in_flight = Some(in_flight);
        self
    }

    pub async fn run(
        &self,
        request: &ReconcileRequest,
        mut shutdown: watch::Receiver<bool>,
    ) -> ReconcileResult<ReconcileReport> {
        let totals = self.source.totals().await.map_err(ReconcileError::Totals)?;
        info!(
            "[history] {} days of totals, reconciling {} -> {} ({:?}{})",
            totals.len(),
            request.start,
            request.end,
            request.direction,
            if request.stats_only { ", stats only" } else { "" }
        );

        let mut report = ReconcileReport::default();
        let mut missing_run = 0u32;

        for date in walk(request.start, request.end, request.direction) {
            if *shutdown.borrow() {
                return Err(ReconcileError::Cancelled);
            }

            let Some(&total) = totals.get(&date) else {
                missing_run += 1;
                warn!("[history] {} missing from totals ({} in a row)", date, missing_run);
                report.skipped.push(date);
                if missing_run >= self.config.max_missing_dates {
                    return Err(ReconcileError::MissingDates {
                        count: missing_run,
                        last: date,
                    });
                }
                continue;
            };
            missing_run = 0;

            let day = self
                .reconcile_day(date, total, request.stats_only, &mut shutdown)
                .await?;
            report.days.push(day);

            if !request.stats_only && sleep_or_cancel(self.config.pause, &mut shutdown).await {
                return Err(ReconcileError::Cancelled);
            }
        }

        info!(
            "[history] finished: {} days, {} enqueued, {} still missing",
            report.days.len(),
            report.enqueued(),
            report.missing()
        );
        Ok(report)
    }

    async fn reconcile_day(
        &self,
        date: NaiveDate,
        total: u64,
        stats_only: bool,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ReconcileResult<DayReport> {
        let range = KillmailFilter::new().within(DateRange::day(date));
        let local_before = self.repo.count_where(&range).await?;
        let mut day = DayReport {
            date,
            total,
            local_before,
            local_after: local_before,
            enqueued: 0,
            passes: 0,
        };

        if stats_only {
            info!(
                "[history] {}: {} local / {} total ({} missing)",
                date,
                local_before,
                total,
                total.saturating_sub(local_before)
            );
            return Ok(day);
        }

        while day.local_after < total && day.passes < self.config.date_passes {
            day.passes += 1;

            let listed = self.fetch_day(date, shutdown).await?;
            let missing = self.missing_items(listed).await?;
            info!(
                "[history] {}: {} local / {} total, enqueuing {} (pass {}/{})",
                date,
                day.local_after,
                total,
                missing.len(),
                day.passes,
                self.config.date_passes
            );

            if !missing.is_empty() {
                day.enqueued += self
                    .dispatcher
                    .dispatch_batch(&missing, self.config.enqueue_batch)
                    .await? as u64;
                self.wait_for_drain(shutdown).await?;
            }
            day.local_after = self.repo.count_where(&range).await?;
        }

        if day.is_complete() {
            info!("[history] {}: complete with {} killmails", date, day.local_after);
        } else {
            warn!(
                "[history] {}: accepting {} of {} after {} passes",
                date, day.local_after, total, day.passes
            );
        }
        Ok(day)
    }

    /// Day listing with bounded retries
    async fn fetch_day(
        &self,
        date: NaiveDate,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ReconcileResult<Vec<WorkItem>> {
        let attempts = self.config.day_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.source.day(date).await {
                Ok(items) => return Ok(items),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        "[history] {}: {}, retrying in {:?} ({}/{})",
                        date, e, self.config.day_backoff, attempt, attempts
                    );
                    if sleep_or_cancel(self.config.day_backoff, shutdown).await {
                        return Err(ReconcileError::Cancelled);
                    }
                }
                Err(source) => {
                    return Err(ReconcileError::DayFetch {
                        date,
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    /// Listed items not yet stored
    async fn missing_items(&self, listed: Vec<WorkItem>) -> ReconcileResult<Vec<WorkItem>> {
        let ids: Vec<u64> = listed.iter().map(|item| item.id).collect();
        let stored: HashSet<u64> = self
            .repo
            .find_where(&KillmailFilter::new().with_ids(ids))
            .await?
            .into_iter()
            .map(|k| k.id)
            .collect();
        Ok(listed
            .into_iter()
            .filter(|item| !stored.contains(&item.id))
            .collect())
    }

    /// Block until the queue is empty and no popped item is still being
    /// handled
    ///
    /// Without an in-flight count, popped items get one more poll interval
    /// to land.
    async fn wait_for_drain(&self, shutdown: &mut watch::Receiver<bool>) -> ReconcileResult<()> {
        let mut polls = 0u64;
        loop {
            let pending = self.dispatcher.queue().len().await?;
            let handling = self.in_flight.as_ref().map_or(0, InFlight::get);
            if pending == 0 && handling == 0 {
                break;
            }
            if polls % 10 == 0 {
                info!(
                    "[history] waiting for {} queued and {} in-flight killmails",
                    pending, handling
                );
            }
            polls += 1;
            if sleep_or_cancel(self.config.drain_poll, shutdown).await {
                return Err(ReconcileError::Cancelled);
            }
        }
        debug!("[history] queue drained after {} polls", polls);
        if self.in_flight.is_none() && sleep_or_cancel(self.config.drain_poll, shutdown).await {
            return Err(ReconcileError::Cancelled);
        }
        Ok(())
    }
}

/// Sleep for `duration`; true if shutdown was requested meanwhile
async fn sleep_or_cancel(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

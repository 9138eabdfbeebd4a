//! Shared health context
//!
//! The single object through which the gateway publishes telemetry, the
//! tracker publishes admission state, and workers wait for clearance.

use crate::config::GateConfig;
use crate::tracking::{TrackingLog, TrackingSnapshot};
use crate::transition::Transition;
use async_trait::async_trait;
use killfeed_core::{AdmissionState, ErrorBudget, LoadSignal, StatusBucket, Timestamp};
use killfeed_ports::{AdmissionGate, TelemetrySink};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Observed {
    budget: Option<ErrorBudget>,
    load: Option<LoadSignal>,
}

pub struct HealthContext {
    state: watch::Sender<AdmissionState>,
    signals: Mutex<Observed>,
    tracking: Mutex<TrackingLog>,
    gate: GateConfig,
}

impl HealthContext {
    pub fn new(gate: GateConfig) -> Arc<Self> {
        let (state, _) = watch::channel(AdmissionState::default());
        Arc::new(Self {
            state,
            signals: Mutex::new(Observed::default()),
            tracking: Mutex::new(TrackingLog::new()),
            gate,
        })
    }

    pub fn state(&self) -> AdmissionState {
        *self.state.borrow()
    }

    /// Watch admission state changes
    pub fn subscribe(&self) -> watch::Receiver<AdmissionState> {
        self.state.subscribe()
    }

    /// Force a state; the tracker will re-evaluate it on its next tick
    pub fn set_state(&self, state: AdmissionState) {
        self.state.send_replace(state);
    }

    /// Publish the outcome of an evaluation, logging real changes
    pub fn apply(&self, transition: &Transition) {
        if !transition.is_change() {
            return;
        }
        self.state.send_replace(transition.to);

        let reason = transition
            .reason
            .map(|r| r.to_string())
            .unwrap_or_default();
        match transition.to {
            AdmissionState::Downtime | AdmissionState::Red => error!(
                "[health] {} -> {} ({})",
                transition.from, transition.to, reason
            ),
            AdmissionState::Yellow => warn!(
                "[health] {} -> {} ({})",
                transition.from, transition.to, reason
            ),
            AdmissionState::Green => info!(
                "[health] {} -> {} ({})",
                transition.from, transition.to, reason
            ),
        }
    }

    pub fn error_budget(&self) -> Option<ErrorBudget> {
        self.signals.lock().budget
    }

    pub fn load_signal(&self) -> Option<LoadSignal> {
        self.signals.lock().load
    }

    pub fn publish_load_signal(&self, signal: LoadSignal) {
        self.signals.lock().load = Some(signal);
    }

    pub fn tracking_snapshot(&self, since: Timestamp) -> TrackingSnapshot {
        self.tracking.lock().snapshot(since)
    }

    pub fn prune_tracking(&self, cutoff: Timestamp) -> usize {
        self.tracking.lock().prune_before(cutoff)
    }
}

impl TelemetrySink for HealthContext {
    fn record_status(&self, bucket: StatusBucket, at: Timestamp) {
        self.tracking.lock().record(bucket, at);
    }

    fn record_error_budget(&self, remaining: i64, reset_at: Option<Timestamp>, at: Timestamp) {
        let mut signals = self.signals.lock();
        // Keep the previous reset time when this response did not carry one
        let reset_at = reset_at.or_else(|| signals.budget.and_then(|b| b.reset_at));
        signals.budget = Some(ErrorBudget::new(remaining, reset_at, at));
    }
}

#[async_trait]
impl AdmissionGate for HealthContext {
    async fn await_clearance(&self) {
        let mut rx = self.state.subscribe();
        let mut announced = false;

        loop {
            let state = *rx.borrow_and_update();
            if !state.is_blocking() {
                if state == AdmissionState::Yellow {
                    tokio::time::sleep(self.gate.yellow_penalty).await;
                }
                return;
            }

            if !announced {
                debug!("[health] holding work while {}", state);
                announced = true;
            }
            // Wake on change, or re-check after the poll interval
            let _ = tokio::time::timeout(self.gate.poll_interval, rx.changed()).await;
        }
    }
}

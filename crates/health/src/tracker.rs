//! Health tracker loop
//!
//! Re-evaluates the admission state on a fixed interval and acts as the
//! janitor for the tracking log.

use crate::config::TrackerConfig;
use crate::context::HealthContext;
use crate::transition::{Reason, Signals, Transition, evaluate};
use killfeed_core::{AdmissionState, Timestamp};
use killfeed_ports::Clock;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub struct HealthTracker {
    ctx: Arc<HealthContext>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    /// Budget observations at or before this instant predate the last reset
    recovered_at: Option<Timestamp>,
}

impl HealthTracker {
    pub fn new(ctx: Arc<HealthContext>, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self {
            ctx,
            clock,
            config,
            recovered_at: None,
        }
    }

    pub fn context(&self) -> &Arc<HealthContext> {
        &self.ctx
    }

    /// Evaluate once and publish the result
    pub fn tick(&mut self) -> Transition {
        let now = self.clock.now();

        let max_age = self.config.load_signal_max_age;
        let load = self
            .ctx
            .load_signal()
            .filter(|signal| now - signal.observed_at <= max_age);
        let recovered_at = self.recovered_at;
        let budget = self
            .ctx
            .error_budget()
            .filter(|budget| recovered_at.is_none_or(|r| budget.observed_at > r));

        let signals = Signals { load, budget, now };
        let transition = evaluate(self.ctx.state(), &signals, &self.config.policy);
        if transition.reason == Some(Reason::BudgetReset) {
            self.recovered_at = Some(now);
        }
        self.ctx.apply(&transition);

        let pruned = self.ctx.prune_tracking(now - self.config.tracking_retention);
        debug!(
            "[health] {} | last {}s: {} | pruned {}",
            transition.to,
            self.config.snapshot_window.num_seconds(),
            self.ctx.tracking_snapshot(now - self.config.snapshot_window),
            pruned
        );

        transition
    }

    /// Tick until `shutdown` flips to true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[health] tracker started (every {:?}, window {}-{} UTC)",
            self.config.poll_interval,
            self.config.policy.window.start,
            self.config.policy.window.end
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[health] tracker stopped in state {}", self.ctx.state());
    }

    pub fn state(&self) -> AdmissionState {
        self.ctx.state()
    }
}

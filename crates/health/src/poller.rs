//! Load-signal poller
//!
//! Periodically asks the upstream how many players are online and whether
//! it is in VIP mode, and publishes the answer to the health context.

use crate::context::HealthContext;
use killfeed_ports::LoadSignalSource;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub struct StatusPoller {
    source: Arc<dyn LoadSignalSource>,
    ctx: Arc<HealthContext>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn LoadSignalSource>, ctx: Arc<HealthContext>, interval: Duration) -> Self {
        Self {
            source,
            ctx,
            interval,
        }
    }

    /// Poll once; a failure leaves the previous signal in place
    pub async fn poll_once(&self) -> bool {
        match self.source.load_signal().await {
            Ok(signal) => {
                debug!(
                    "[health] load signal: {} active, vip={}",
                    signal.active_count, signal.maintenance
                );
                self.ctx.publish_load_signal(signal);
                true
            }
            Err(e) => {
                warn!("[health] status poll failed: {}", e);
                false
            }
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("[health] status poller started (every {:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[health] status poller stopped");
    }
}

//! Live feed listener
//!
//! Subscribes to the upstream killstream websocket and dispatches every
//! announced killmail onto the work queue. Any connection error or close
//! ends the session; the listener reconnects after `reconnect_delay`.

use crate::dispatch::Dispatcher;
use crate::error::PipelineResult;
use futures_util::{SinkExt, StreamExt};
use killfeed_core::WorkItem;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub const DEFAULT_FEED_URL: &str = "wss://zkillboard.com/websocket/";
pub const DEFAULT_CHANNEL: &str = "killstream";

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub channel: String,
    pub reconnect_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Deserialize)]
struct Announcement {
    #[serde(rename = "killID")]
    kill_id: Option<u64>,
    hash: Option<String>,
}

/// Extract a work item from a feed message
///
/// Messages without both `killID` and `hash` are ignored.
pub fn parse_feed_message(text: &str) -> Option<WorkItem> {
    let announcement: Announcement = serde_json::from_str(text).ok()?;
    Some(WorkItem::new(announcement.kill_id?, announcement.hash?))
}

enum SessionEnd {
    Closed,
    Shutdown,
}

pub struct FeedListener {
    config: FeedConfig,
    dispatcher: Dispatcher,
    dispatched: AtomicU64,
    sessions: AtomicU64,
}

impl FeedListener {
    pub fn new(config: FeedConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            dispatched: AtomicU64::new(0),
            sessions: AtomicU64::new(0),
        }
    }

    /// Items pushed onto the queue so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Connections established so far
    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("[feed] listening on {} ({})", self.config.url, self.config.channel);
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.session(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) => info!("[feed] connection closed, reconnecting"),
                Err(e) => error!("[feed] {}, reconnecting", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[feed] stopped after {} dispatched", self.dispatched());
    }

    async fn session(&self, shutdown: &mut watch::Receiver<bool>) -> PipelineResult<SessionEnd> {
        let (stream, _) = connect_async(self.config.url.as_str()).await?;
        let (mut write, mut read) = stream.split();
        self.sessions.fetch_add(1, Ordering::Relaxed);

        let subscribe = serde_json::json!({ "action": "sub", "channel": self.config.channel });
        write.send(Message::Text(subscribe.to_string().into())).await?;
        info!("[feed] connected, subscribed to {}", self.config.channel);

        loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle(text.as_str()).await,
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }

    async fn handle(&self, text: &str) {
        let Some(item) = parse_feed_message(text) else {
            debug!("[feed] ignoring message: {}", text);
            return;
        };
        match self.dispatcher.dispatch(&item).await {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                info!("[feed] dispatched {}", item);
            }
            Err(e) => warn!("[feed] unable to queue {}: {}", item, e),
        }
    }
}

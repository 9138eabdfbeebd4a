//! Time-ordered log of response status buckets

use killfeed_core::{StatusBucket, Timestamp};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Per-bucket response timestamps, oldest first
#[derive(Debug, Default)]
pub struct TrackingLog {
    entries: HashMap<StatusBucket, VecDeque<Timestamp>>,
}

impl TrackingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, bucket: StatusBucket, at: Timestamp) {
        let queue = self.entries.entry(bucket).or_default();
        // Responses finish out of order under concurrency; keep the deque sorted
        let pos = queue.iter().rposition(|t| *t <= at).map_or(0, |i| i + 1);
        queue.insert(pos, at);
    }

    /// Entries at or after `since`
    pub fn count_since(&self, bucket: StatusBucket, since: Timestamp) -> usize {
        self.entries
            .get(&bucket)
            .map(|queue| queue.iter().rev().take_while(|t| **t >= since).count())
            .unwrap_or(0)
    }

    /// Drop entries strictly older than `cutoff`, returning how many went
    pub fn prune_before(&mut self, cutoff: Timestamp) -> usize {
        let mut pruned = 0;
        for queue in self.entries.values_mut() {
            while queue.front().is_some_and(|t| *t < cutoff) {
                queue.pop_front();
                pruned += 1;
            }
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self, since: Timestamp) -> TrackingSnapshot {
        TrackingSnapshot {
            ok: self.count_since(StatusBucket::Ok, since),
            not_modified: self.count_since(StatusBucket::NotModified, since),
            calm_down: self.count_since(StatusBucket::CalmDown, since),
            client_error: self.count_since(StatusBucket::ClientError, since),
            server_error: self.count_since(StatusBucket::ServerError, since),
        }
    }
}

/// Bucket counts over a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingSnapshot {
    pub ok: usize,
    pub not_modified: usize,
    pub calm_down: usize,
    pub client_error: usize,
    pub server_error: usize,
}

impl TrackingSnapshot {
    pub fn total(&self) -> usize {
        self.ok + self.not_modified + self.calm_down + self.client_error + self.server_error
    }
}

impl fmt::Display for TrackingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "200={} 304={} 420={} 4xx={} 5xx={}",
            self.ok, self.not_modified, self.calm_down, self.client_error, self.server_error
        )
    }
}

use chrono::Duration;
use killfeed_core::Timestamp;
use killfeed_ports::Clock;
use parking_lot::RwLock;
use std::sync::Arc;

/// Fixed clock that only moves when told to
///
/// Used to drive the health tracker through downtime windows and budget
/// resets deterministically.
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(initial: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(initial),
        })
    }

    /// Move time forward by `duration`
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write();
        *current += duration;
    }

    /// Jump to an explicit time
    ///
    /// Warning: This can move time backwards. Use with caution.
    pub fn set(&self, time: Timestamp) {
        *self.current.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }
}

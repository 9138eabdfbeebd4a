use chrono::Utc;
use killfeed_core::Timestamp;
use killfeed_ports::Clock;

/// Wall-clock UTC time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

//! Scheduled daily downtime window

use chrono::NaiveTime;
use killfeed_core::Timestamp;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTime(String),
}

/// Daily UTC window during which the upstream is expected to be down
///
/// Both ends are inclusive. A window whose end precedes its start wraps
/// past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DowntimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for DowntimeWindow {
    /// 10:58 to 11:25 UTC
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(10, 58, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(11, 25, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DowntimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` bounds
    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        Ok(Self::new(parse_time(start)?, parse_time(end)?))
    }

    pub fn contains(&self, now: Timestamp) -> bool {
        let t = now.time();
        if self.start <= self.end {
            t >= self.start && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, WindowError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|_| WindowError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, s).unwrap()
    }

    #[test]
    fn test_default_window() {
        let window = DowntimeWindow::default();
        assert!(!window.contains(at(10, 57, 59)));
        assert!(window.contains(at(10, 58, 0)));
        assert!(window.contains(at(11, 10, 0)));
        assert!(window.contains(at(11, 25, 0)));
        assert!(!window.contains(at(11, 25, 1)));
    }

    #[test]
    fn test_window_recurs_daily() {
        let window = DowntimeWindow::default();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 16, 11, 0, 0).unwrap();
        assert!(window.contains(next_day));
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let window = DowntimeWindow::parse("23:30", "00:15").unwrap();
        assert!(window.contains(at(23, 45, 0)));
        assert!(window.contains(at(0, 10, 0)));
        assert!(!window.contains(at(12, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            DowntimeWindow::parse("25:00", "11:00"),
            Err(WindowError::InvalidTime("25:00".to_string()))
        );
        assert!(DowntimeWindow::parse("10:58:30", "11:25").is_ok());
    }
}

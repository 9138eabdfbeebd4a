use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type used throughout the system
pub type Timestamp = DateTime<Utc>;

/// Day key format used by the history source and backup layout: `20240101`
pub const DAY_FORMAT: &str = "%Y%m%d";

/// Parse a `YYYYMMDD` day key
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT).ok()
}

/// Format a date as a `YYYYMMDD` day key
pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Inclusive time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// The whole UTC day, 00:00:00 through 23:59:59
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = date
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .unwrap_or(start);
        Self { start, end }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_key_round_trip() {
        let date = parse_day("20240101").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(format_day(date), "20240101");
        assert!(parse_day("2024-01-01").is_none());
    }

    #[test]
    fn test_day_range_bounds() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
    }
}

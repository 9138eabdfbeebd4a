use chrono::NaiveDate;
use killfeed_core::Timestamp;

/// Source of the current UTC time
///
/// Production code reads the wall clock. Tests freeze it and step it across
/// the daily downtime window or past an error-budget reset.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Calendar day of [`Clock::now`]
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

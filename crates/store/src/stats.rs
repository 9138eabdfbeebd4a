//! Per-day killmail counters

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use killfeed_core::Killmail;
use killfeed_ports::StatsObserver;
use log::trace;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTally {
    pub total: u64,
    pub npc: u64,
    pub solo: u64,
}

/// Counts newly stored killmails by UTC day of the kill
pub struct DailyTally {
    days: Arc<DashMap<NaiveDate, DayTally>>,
}

impl DailyTally {
    pub fn new() -> Self {
        Self {
            days: Arc::new(DashMap::new()),
        }
    }

    pub fn day(&self, date: NaiveDate) -> DayTally {
        self.days.get(&date).map(|t| *t).unwrap_or_default()
    }

    pub fn total(&self) -> u64 {
        self.days.iter().map(|t| t.total).sum()
    }

    /// All tallies, oldest day first
    pub fn days(&self) -> Vec<(NaiveDate, DayTally)> {
        let mut days: Vec<_> = self.days.iter().map(|e| (*e.key(), *e.value())).collect();
        days.sort_by_key(|(date, _)| *date);
        days
    }
}

impl Default for DailyTally {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DailyTally {
    fn clone(&self) -> Self {
        Self {
            days: Arc::clone(&self.days),
        }
    }
}

#[async_trait]
impl StatsObserver for DailyTally {
    async fn observe(&self, killmail: &Killmail) {
        let date = killmail.killmail_time.date_naive();
        let mut tally = self.days.entry(date).or_default();
        tally.total += 1;
        if killmail.is_npc {
            tally.npc += 1;
        }
        if killmail.is_solo {
            tally.solo += 1;
        }
        trace!("[stats] {} -> {:?}", killmail.id, *tally);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use killfeed_core::Victim;

    fn killmail(id: u64, day: u32, is_npc: bool, is_solo: bool) -> Killmail {
        Killmail {
            id,
            hash: "h".into(),
            killmail_time: Utc.with_ymd_and_hms(2024, 5, day, 9, 30, 0).unwrap(),
            solar_system_id: 30000142,
            moon_id: None,
            war_id: None,
            is_npc,
            is_solo,
            victim: Victim {
                character_id: None,
                corporation_id: Some(1000125),
                alliance_id: None,
                faction_id: None,
                damage_taken: 0,
                ship_type_id: 670,
                position: None,
                items: vec![],
            },
            attackers: vec![],
        }
    }

    #[tokio::test]
    async fn test_tallies_by_kill_day() {
        let tally = DailyTally::new();
        tally.observe(&killmail(1, 1, true, false)).await;
        tally.observe(&killmail(2, 1, false, true)).await;
        tally.observe(&killmail(3, 2, false, false)).await;

        let first = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(tally.day(first), DayTally { total: 2, npc: 1, solo: 1 });
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.days().first().map(|(d, _)| *d), Some(first));
        assert_eq!(
            tally.day(NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()),
            DayTally::default()
        );
    }
}

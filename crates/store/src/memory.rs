//! In-memory adapters
//!
//! Process-local queue and repository. Nothing survives a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use killfeed_core::{Killmail, WorkItem};
use killfeed_ports::{
    InsertOutcome, KillmailFilter, KillmailRepository, QueueResult, QueueStore, StorageResult,
};
use parking_lot::Mutex;
use priority_queue::DoublePriorityQueue;
use std::sync::Arc;

/// Sorted-set queue keyed by `WorkItem`
///
/// Ties on score are broken by the item itself so the order is stable.
pub struct InMemoryQueue {
    items: Arc<Mutex<DoublePriorityQueue<WorkItem, (i64, u64)>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(DoublePriorityQueue::new())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Current score of an item, if queued
    pub fn score_of(&self, item: &WorkItem) -> Option<i64> {
        self.items.lock().get_priority(item).map(|(score, _)| *score)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryQueue {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

#[async_trait]
impl QueueStore for InMemoryQueue {
    async fn push(&self, item: &WorkItem, score: i64) -> QueueResult<()> {
        // Replaces the priority when the item is already queued
        self.items.lock().push(item.clone(), (score, item.id));
        Ok(())
    }

    async fn pop_min(&self) -> QueueResult<Option<WorkItem>> {
        Ok(self.items.lock().pop_min().map(|(item, _)| item))
    }

    async fn count_in_range(&self, min: i64, max: i64) -> QueueResult<u64> {
        let count = self
            .items
            .lock()
            .iter()
            .filter(|(_, (score, _))| (min..=max).contains(score))
            .count();
        Ok(count as u64)
    }
}

/// Killmail repository backed by a concurrent map
pub struct InMemoryKillmailRepository {
    killmails: Arc<DashMap<u64, Killmail>>,
}

impl InMemoryKillmailRepository {
    pub fn new() -> Self {
        Self {
            killmails: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.killmails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.killmails.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<Killmail> {
        self.killmails.get(&id).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryKillmailRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryKillmailRepository {
    fn clone(&self) -> Self {
        Self {
            killmails: Arc::clone(&self.killmails),
        }
    }
}

#[async_trait]
impl KillmailRepository for InMemoryKillmailRepository {
    async fn exists(&self, id: u64) -> StorageResult<bool> {
        Ok(self.killmails.contains_key(&id))
    }

    async fn insert(&self, killmail: &Killmail) -> StorageResult<InsertOutcome> {
        match self.killmails.entry(killmail.id) {
            Entry::Occupied(_) => Ok(InsertOutcome::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(killmail.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn count_where(&self, filter: &KillmailFilter) -> StorageResult<u64> {
        let count = self
            .killmails
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(count as u64)
    }

    async fn find_where(&self, filter: &KillmailFilter) -> StorageResult<Vec<Killmail>> {
        let mut found: Vec<Killmail> = self
            .killmails
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|k| k.id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use killfeed_core::{DateRange, Victim};

    fn item(id: u64) -> WorkItem {
        WorkItem::new(id, format!("h{}", id))
    }

    fn killmail(id: u64, day: u32) -> Killmail {
        Killmail {
            id,
            hash: format!("h{}", id),
            killmail_time: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            solar_system_id: 30000142,
            moon_id: None,
            war_id: None,
            is_npc: false,
            is_solo: false,
            victim: Victim {
                character_id: Some(1),
                corporation_id: Some(98_000_001),
                alliance_id: None,
                faction_id: None,
                damage_taken: 100,
                ship_type_id: 587,
                position: None,
                items: vec![],
            },
            attackers: vec![],
        }
    }

    #[tokio::test]
    async fn test_queue_pops_lowest_score_first() {
        let queue = InMemoryQueue::new();
        queue.push(&item(3), 30).await.unwrap();
        queue.push(&item(1), 10).await.unwrap();
        queue.push(&item(2), 20).await.unwrap();

        assert_eq!(queue.pop_min().await.unwrap(), Some(item(1)));
        assert_eq!(queue.pop_min().await.unwrap(), Some(item(2)));
        assert_eq!(queue.pop_min().await.unwrap(), Some(item(3)));
        assert_eq!(queue.pop_min().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_queue_push_existing_updates_score() {
        let queue = InMemoryQueue::new();
        queue.push(&item(1), 10).await.unwrap();
        queue.push(&item(2), 20).await.unwrap();
        queue.push(&item(1), 30).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(queue.score_of(&item(1)), Some(30));
        assert_eq!(queue.pop_min().await.unwrap(), Some(item(2)));
    }

    #[tokio::test]
    async fn test_queue_count_in_range_is_inclusive() {
        let queue = InMemoryQueue::new();
        for (id, score) in [(1, 5), (2, 10), (3, 15), (4, 20)] {
            queue.push(&item(id), score).await.unwrap();
        }
        assert_eq!(queue.count_in_range(10, 15).await.unwrap(), 2);
        assert_eq!(queue.count_in_range(21, 100).await.unwrap(), 0);
        assert_eq!(queue.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_repository_reports_duplicates() {
        let repo = InMemoryKillmailRepository::new();
        assert_eq!(repo.insert(&killmail(7, 1)).await.unwrap(), InsertOutcome::Inserted);

        let mut changed = killmail(7, 2);
        changed.is_solo = true;
        assert_eq!(repo.insert(&changed).await.unwrap(), InsertOutcome::Duplicate);
        assert!(!repo.get(7).unwrap().is_solo);
        assert!(repo.exists(7).await.unwrap());
        assert!(!repo.exists(8).await.unwrap());
    }

    #[tokio::test]
    async fn test_repository_filters_by_day_and_ids() {
        let repo = InMemoryKillmailRepository::new();
        for (id, day) in [(1, 1), (2, 1), (3, 2), (4, 3)] {
            repo.insert(&killmail(id, day)).await.unwrap();
        }
        let day1 = DateRange::day(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let filter = KillmailFilter::new().within(day1);
        assert_eq!(repo.count_where(&filter).await.unwrap(), 2);

        let filter = KillmailFilter::new().with_ids(vec![2, 3, 99]);
        let ids: Vec<u64> = repo.find_where(&filter).await.unwrap().iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let filter = KillmailFilter::new().within(day1).with_ids(vec![2, 3]);
        assert_eq!(repo.count_where(&filter).await.unwrap(), 1);
        assert_eq!(repo.count_where(&KillmailFilter::new()).await.unwrap(), 4);
    }

    #[test]
    fn test_clones_share_state() {
        let repo = InMemoryKillmailRepository::new();
        let other = repo.clone();
        other.killmails.insert(1, killmail(1, 1));
        assert_eq!(repo.len(), 1);
    }
}

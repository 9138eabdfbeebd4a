//! SQLite adapter
//!
//! One database file holds both the killmail table and the work queue, so
//! a crawler and any number of importers on the same host share state.
//! Calls run on the blocking pool behind a single connection lock.

use async_trait::async_trait;
use chrono::DateTime;
use killfeed_core::{Killmail, Timestamp, WorkItem};
use killfeed_ports::{
    InsertOutcome, KillmailFilter, KillmailRepository, QueueError, QueueResult, QueueStore,
    StorageError, StorageResult,
};
use log::info;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Upper bound on bound parameters per id-filtered statement
const ID_CHUNK: usize = 500;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Backend(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        info!("[store] opened sqlite database {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Backend(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await;
        match joined {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(format!("sqlite task failed: {}", e)),
        }
    }
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// WHERE clause and parameters for one slice of a filter
fn where_clause(filter: &KillmailFilter, ids: Option<&[u64]>) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(range) = &filter.range {
        clauses.push("killmail_time BETWEEN ? AND ?".to_string());
        values.push(Value::Integer(range.start.timestamp()));
        values.push(Value::Integer(range.end.timestamp()));
    }
    if let Some(ids) = ids {
        let marks = vec!["?"; ids.len()].join(", ");
        clauses.push(format!("id IN ({})", marks));
        values.extend(ids.iter().map(|id| Value::Integer(*id as i64)));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

/// Split a filter into statements that stay under the parameter limit
fn statements(filter: &KillmailFilter) -> Vec<(String, Vec<Value>)> {
    match &filter.ids {
        None => vec![where_clause(filter, None)],
        Some(ids) if ids.is_empty() => Vec::new(),
        Some(ids) => ids
            .chunks(ID_CHUNK)
            .map(|chunk| where_clause(filter, Some(chunk)))
            .collect(),
    }
}

#[async_trait]
impl QueueStore for SqliteStore {
    async fn push(&self, item: &WorkItem, score: i64) -> QueueResult<()> {
        let id = item.id as i64;
        let hash = item.hash.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO queue (id, hash, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT (id, hash) DO UPDATE SET score = excluded.score",
                params![id, hash, score],
            )
        })
        .await
        .map_err(QueueError::Backend)?;
        Ok(())
    }

    async fn pop_min(&self) -> QueueResult<Option<WorkItem>> {
        let popped = self
            .with_conn(|conn| {
                let tx = conn.transaction()?;
                let head: Option<(i64, String)> = tx
                    .query_row(
                        "SELECT id, hash FROM queue ORDER BY score ASC, id ASC LIMIT 1",
                        [],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                if let Some((id, hash)) = &head {
                    tx.execute(
                        "DELETE FROM queue WHERE id = ?1 AND hash = ?2",
                        params![id, hash],
                    )?;
                }
                tx.commit()?;
                Ok(head)
            })
            .await
            .map_err(QueueError::Backend)?;

        match popped {
            None => Ok(None),
            Some((id, hash)) if id >= 0 => Ok(Some(WorkItem::new(id as u64, hash))),
            Some((id, hash)) => Err(QueueError::Corrupt(format!("{}:{}", id, hash))),
        }
    }

    async fn count_in_range(&self, min: i64, max: i64) -> QueueResult<u64> {
        let count: i64 = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM queue WHERE score BETWEEN ?1 AND ?2",
                    params![min, max],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(QueueError::Backend)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl KillmailRepository for SqliteStore {
    async fn exists(&self, id: u64) -> StorageResult<bool> {
        let id = id as i64;
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM killmails WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(StorageError::Backend)
    }

    async fn insert(&self, killmail: &Killmail) -> StorageResult<InsertOutcome> {
        let record = serde_json::to_string(killmail)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let id = killmail.id as i64;
        let hash = killmail.hash.clone();
        let time = killmail.killmail_time.timestamp();

        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO killmails (id, hash, killmail_time, record)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, hash, time, record],
                )
            })
            .await
            .map_err(StorageError::Backend)?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn count_where(&self, filter: &KillmailFilter) -> StorageResult<u64> {
        let statements = statements(filter);
        let count: i64 = self
            .with_conn(move |conn| {
                let mut total = 0i64;
                for (clause, values) in statements {
                    let sql = format!("SELECT COUNT(*) FROM killmails{}", clause);
                    let n: i64 =
                        conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
                    total += n;
                }
                Ok(total)
            })
            .await
            .map_err(StorageError::Backend)?;
        Ok(count.max(0) as u64)
    }

    async fn find_where(&self, filter: &KillmailFilter) -> StorageResult<Vec<Killmail>> {
        let statements = statements(filter);
        let records: Vec<String> = self
            .with_conn(move |conn| {
                let mut out = Vec::new();
                for (clause, values) in statements {
                    let sql = format!("SELECT record FROM killmails{} ORDER BY id", clause);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
                    for row in rows {
                        out.push(row?);
                    }
                }
                Ok(out)
            })
            .await
            .map_err(StorageError::Backend)?;

        let mut killmails = records
            .iter()
            .map(|r| serde_json::from_str::<Killmail>(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        killmails.sort_by_key(|k| k.id);
        Ok(killmails)
    }
}

impl SqliteStore {
    /// Earliest and latest stored killmail times
    pub async fn time_bounds(
        &self,
    ) -> StorageResult<Option<(Timestamp, Timestamp)>> {
        let bounds: (Option<i64>, Option<i64>) = self
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT MIN(killmail_time), MAX(killmail_time) FROM killmails",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .map_err(StorageError::Backend)?;

        Ok(match bounds {
            (Some(min), Some(max)) => DateTime::from_timestamp(min, 0)
                .zip(DateTime::from_timestamp(max, 0)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use killfeed_core::{DateRange, Victim};

    fn killmail(id: u64, day: u32, hour: u32) -> Killmail {
        Killmail {
            id,
            hash: format!("h{}", id),
            killmail_time: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            solar_system_id: 30002187,
            moon_id: None,
            war_id: None,
            is_npc: false,
            is_solo: true,
            victim: Victim {
                character_id: Some(90000001),
                corporation_id: Some(98000002),
                alliance_id: None,
                faction_id: None,
                damage_taken: 4200,
                ship_type_id: 24690,
                position: None,
                items: vec![],
            },
            attackers: vec![],
        }
    }

    #[tokio::test]
    async fn test_queue_orders_by_score_and_dedupes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = WorkItem::new(1, "a");
        let b = WorkItem::new(2, "b");

        store.push(&a, 100).await.unwrap();
        store.push(&b, 50).await.unwrap();
        store.push(&a, 10).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 2);
        assert_eq!(store.count_in_range(0, 49).await.unwrap(), 1);
        assert_eq!(store.pop_min().await.unwrap(), Some(a));
        assert_eq!(store.pop_min().await.unwrap(), Some(b));
        assert_eq!(store.pop_min().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let km = killmail(10, 1, 8);

        assert_eq!(store.insert(&km).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&km).await.unwrap(), InsertOutcome::Duplicate);
        assert!(store.exists(10).await.unwrap());
        assert_eq!(store.count_where(&KillmailFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filters_by_day_boundaries() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&killmail(1, 1, 0)).await.unwrap();
        store.insert(&killmail(2, 1, 23)).await.unwrap();
        store.insert(&killmail(3, 2, 0)).await.unwrap();

        let day = DateRange::day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let filter = KillmailFilter::new().within(day);
        assert_eq!(store.count_where(&filter).await.unwrap(), 2);

        let found = store.find_where(&filter).await.unwrap();
        assert_eq!(found.iter().map(|k| k.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(found[0], killmail(1, 1, 0));
    }

    #[tokio::test]
    async fn test_id_filter_spans_chunks() {
        let store = SqliteStore::open_in_memory().unwrap();
        for id in 1..=5 {
            store.insert(&killmail(id, 4, 12)).await.unwrap();
        }
        let mut ids: Vec<u64> = (1000..2200).collect();
        ids.extend([2, 4]);

        let filter = KillmailFilter::new().with_ids(ids);
        assert_eq!(store.count_where(&filter).await.unwrap(), 2);
        assert_eq!(
            store
                .count_where(&KillmailFilter::new().with_ids(vec![]))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_time_bounds() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.time_bounds().await.unwrap(), None);

        store.insert(&killmail(1, 3, 5)).await.unwrap();
        store.insert(&killmail(2, 1, 7)).await.unwrap();
        let (min, max) = store.time_bounds().await.unwrap().unwrap();
        assert_eq!(min, Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap());
        assert_eq!(max, Utc.with_ymd_and_hms(2024, 3, 3, 5, 0, 0).unwrap());
    }
}

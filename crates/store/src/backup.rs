//! Raw payload archive on the local filesystem
//!
//! Layout: `{root}/{YYYYMMDD}/{id}:{hash}.json`, each file an envelope
//! `{"id": .., "hash": .., "killmail": <upstream payload>}`.

use async_trait::async_trait;
use chrono::NaiveDate;
use killfeed_core::{WorkItem, format_day};
use killfeed_ports::{BackupError, BackupSink};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    hash: &'a str,
    killmail: Value,
}

#[derive(Debug, Clone)]
pub struct DirectoryBackup {
    root: PathBuf,
}

impl DirectoryBackup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, date: NaiveDate, item: &WorkItem) -> PathBuf {
        self.root
            .join(format_day(date))
            .join(format!("{}:{}.json", item.id, item.hash))
    }
}

#[async_trait]
impl BackupSink for DirectoryBackup {
    async fn store(&self, date: NaiveDate, item: &WorkItem, raw: &[u8]) -> Result<(), BackupError> {
        let killmail: Value =
            serde_json::from_slice(raw).map_err(|e| BackupError::Encode(e.to_string()))?;
        let envelope = Envelope {
            id: item.id,
            hash: &item.hash,
            killmail,
        };
        let bytes =
            serde_json::to_vec(&envelope).map_err(|e| BackupError::Encode(e.to_string()))?;

        let path = self.path_for(date, item);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| BackupError::Io(format!("{}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BackupError::Io(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_envelope_under_day_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backup = DirectoryBackup::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let item = WorkItem::new(115_000_001, "deadbeef");

        backup
            .store(date, &item, br#"{"killmail_id":115000001,"attackers":[]}"#)
            .await
            .unwrap();

        let path = dir.path().join("20240229").join("115000001:deadbeef.json");
        assert_eq!(backup.path_for(date, &item), path);

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["id"], 115_000_001);
        assert_eq!(written["hash"], "deadbeef");
        assert_eq!(written["killmail"]["killmail_id"], 115_000_001);
    }

    #[tokio::test]
    async fn test_rejects_non_json_payload() {
        let dir = tempfile::tempdir().unwrap();
        let backup = DirectoryBackup::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();

        let err = backup
            .store(date, &WorkItem::new(1, "x"), b"<html>")
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Encode(_)));
        assert!(!dir.path().join("20240229").exists());
    }
}

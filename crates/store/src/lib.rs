//! Killfeed Store
//!
//! Adapters behind the storage-side ports:
//!
//! | Adapter                      | Ports                               | Use            |
//! |------------------------------|-------------------------------------|----------------|
//! | `InMemoryQueue`              | `QueueStore`                        | tests, one-off runs |
//! | `InMemoryKillmailRepository` | `KillmailRepository`                | tests          |
//! | `SqliteStore`                | `QueueStore` + `KillmailRepository` | production     |
//! | `DirectoryBackup`            | `BackupSink`                        | raw payload archive |
//! | `DailyTally`                 | `StatsObserver`                     | per-day counters |

pub mod backup;
pub mod memory;
pub mod sqlite;
pub mod stats;

pub use backup::DirectoryBackup;
pub use memory::{InMemoryKillmailRepository, InMemoryQueue};
pub use sqlite::SqliteStore;
pub use stats::{DailyTally, DayTally};

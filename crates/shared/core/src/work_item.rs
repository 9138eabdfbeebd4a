use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A pending killmail: upstream id plus the hash needed to fetch it
///
/// Identity is the id; the hash is an integrity token for the fetch path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub hash: String,
}

impl WorkItem {
    pub fn new(id: u64, hash: impl Into<String>) -> Self {
        Self {
            id,
            hash: hash.into(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.hash)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWorkItemError {
    #[error("expected <id>:<hash>, got {0:?}")]
    Format(String),

    #[error("invalid killmail id: {0:?}")]
    Id(String),
}

impl FromStr for WorkItem {
    type Err = ParseWorkItemError;

    /// Parses the `id:hash` form used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, hash) = s
            .split_once(':')
            .ok_or_else(|| ParseWorkItemError::Format(s.to_string()))?;
        if hash.is_empty() {
            return Err(ParseWorkItemError::Format(s.to_string()));
        }
        let id = id
            .trim()
            .parse()
            .map_err(|_| ParseWorkItemError::Id(id.to_string()))?;
        Ok(Self::new(id, hash.trim()))
    }
}

//! Record model shared by both tiers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A stored record. `id` is unique across both tiers; `partition_key` is only
/// meaningful for hot-store addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub partition_key: String,
    /// Created-or-updated time in Unix milliseconds.
    pub timestamp_ms: i64,
    #[serde(default)]
    pub payload: JsonValue,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        partition_key: impl Into<String>,
        timestamp_ms: i64,
        payload: JsonValue,
    ) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
            timestamp_ms,
            payload,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.id, &self.partition_key)
    }

    /// True when the record is strictly older than `cutoff_ms`.
    pub fn is_older_than(&self, cutoff_ms: i64) -> bool {
        self.timestamp_ms < cutoff_ms
    }
}

/// Hot-store address of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub id: String,
    pub partition_key: String,
}

impl RecordKey {
    pub fn new(id: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.partition_key)
    }
}

/// Which store currently holds a record. Derived at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Cold,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Cold => "cold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record together with the tier it was served from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRecord {
    pub tier: Tier,
    pub record: Record,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

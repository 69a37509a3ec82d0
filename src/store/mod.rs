//! Storage facades for the two tiers.
//!
//! The migration engine and read resolver only see these traits. Adapters
//! hold no migration policy: no cutoffs, no retries, no ordering decisions
//! beyond what `query_older_than` promises.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::record::{Record, RecordKey};
use crate::retry::IsRetryable;

pub mod fs;
pub mod http;
pub mod memory;

pub use fs::{FsColdStore, FsHotStore};
pub use http::HttpColdStore;
pub use memory::{MemoryColdStore, MemoryHotStore};

/// Errors surfaced by store adapters.
#[derive(Debug)]
pub enum StoreError {
    /// The call did not complete within its deadline.
    Timeout(Duration),
    /// Network failure, throttling, or a backend that is briefly down.
    Unavailable(String),
    /// Non-success HTTP status from an object store.
    Http { status: u16, key: String },
    /// Local I/O failure.
    Io(String),
    /// The backend returned data that could not be understood.
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Timeout(limit) => {
                write!(f, "store call timed out after {}ms", limit.as_millis())
            }
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Http { status, key } => write!(f, "HTTP {} for {}", status, key),
            StoreError::Io(msg) => write!(f, "io error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl IsRetryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Unavailable(_) => true,
            StoreError::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            StoreError::Io(_) => false,
            StoreError::Corrupt(_) => false,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// Low-latency record store holding recent records.
#[async_trait]
pub trait HotStore: Send + Sync {
    /// Point read. `Ok(None)` means the record is absent.
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

    /// Records with `timestamp_ms < cutoff_ms`, oldest first, at most `limit`.
    /// Ties on timestamp are broken by id so repeated queries are stable.
    async fn query_older_than(&self, cutoff_ms: i64, limit: usize)
        -> Result<Vec<Record>, StoreError>;

    /// Point delete. Deleting an absent key succeeds.
    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError>;
}

/// Durable, cost-optimized blob store holding archived records.
#[async_trait]
pub trait ColdStore: Send + Sync {
    /// Upsert. `Ok(())` is the durability signal; anything else is a failure.
    async fn put(&self, key: &str, blob: Bytes) -> Result<(), StoreError>;

    /// Point read. `Ok(None)` means no blob under `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;
}

/// Sort helper shared by hot store adapters: timestamp ascending, then id.
pub(crate) fn sort_oldest_first(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.timestamp_ms
            .cmp(&b.timestamp_ms)
            .then_with(|| a.id.cmp(&b.id))
    });
}

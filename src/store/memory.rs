//! In-process stores backed by tokio `RwLock`ed maps.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{sort_oldest_first, ColdStore, HotStore, StoreError};
use crate::record::{Record, RecordKey};

/// Hot tier kept entirely in memory.
#[derive(Default)]
pub struct MemoryHotStore {
    records: RwLock<BTreeMap<RecordKey, Record>>,
}

impl MemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write path used by ingestion and tests. Replaces any existing record.
    pub async fn insert(&self, record: Record) {
        let mut records = self.records.write().await;
        records.insert(record.key(), record);
    }

    pub async fn contains(&self, key: &RecordKey) -> bool {
        self.records.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HotStore for MemoryHotStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn query_older_than(
        &self,
        cutoff_ms: i64,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<Record> = records
            .values()
            .filter(|r| r.is_older_than(cutoff_ms))
            .cloned()
            .collect();
        sort_oldest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

/// Cold tier kept entirely in memory.
#[derive(Default)]
pub struct MemoryColdStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryColdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ColdStore for MemoryColdStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<(), StoreError> {
        self.blobs.write().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }
}

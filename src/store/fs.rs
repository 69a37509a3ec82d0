//! Filesystem-backed stores.
//!
//! Both write through a temp file followed by a rename, so a reader never
//! observes a half-written record or blob.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::{sort_oldest_first, ColdStore, HotStore, StoreError};
use crate::keys::path_segment;
use crate::record::{Record, RecordKey};

const RECORD_EXT: &str = "json";

/// Hot tier laid out as `{root}/{partition}/{id}.json`, both path parts
/// percent-encoded. Empty and dot-only values are escaped so every record
/// lives exactly one directory below the root.
pub struct FsHotStore {
    root: PathBuf,
}

impl FsHotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &RecordKey) -> PathBuf {
        self.root
            .join(path_segment(&key.partition_key))
            .join(format!("{}.{}", path_segment(&key.id), RECORD_EXT))
    }

    /// Write path used by ingestion and tests. Replaces any existing record.
    pub async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let body = serde_json::to_vec(record).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        write_atomic(&self.path_for(&record.key()), &body).await
    }

    async fn read_record(path: &Path) -> Result<Option<Record>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(body) => serde_json::from_slice(&body)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl HotStore for FsHotStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        let path = self.path_for(key);
        match Self::read_record(&path).await? {
            Some(record) if record.key() != *key => Err(StoreError::Corrupt(format!(
                "{} holds record {}, expected {}",
                path.display(),
                record.key(),
                key
            ))),
            found => Ok(found),
        }
    }

    async fn query_older_than(
        &self,
        cutoff_ms: i64,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let mut matching = Vec::new();

        let mut partitions = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(matching),
            Err(e) => return Err(e.into()),
        };

        while let Some(partition) = partitions.next_entry().await? {
            if !partition.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(partition.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                    continue;
                }
                match Self::read_record(&path).await {
                    Ok(Some(record)) if record.is_older_than(cutoff_ms) => matching.push(record),
                    Ok(_) => {}
                    // One bad file must not hide every other eligible record.
                    Err(StoreError::Corrupt(msg)) => {
                        warn!(error = %msg, "skipping unreadable hot record");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        sort_oldest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cold tier storing each blob at `{root}/{key}`.
pub struct FsColdStore {
    root: PathBuf,
}

impl FsColdStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StoreError::Corrupt(format!("invalid cold key '{}'", key)));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl ColdStore for FsColdStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<(), StoreError> {
        write_atomic(&self.path_for(key)?, &blob).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(body) => Ok(Some(Bytes::from(body))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `body` to `path` via a synced temp file and rename.
async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::Io(format!("{} has no parent", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::Io(format!("{} has no file name", path.display())))?;
    let tmp = parent.join(format!(".{}.tmp-{:016x}", file_name, rand::random::<u64>()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(body).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

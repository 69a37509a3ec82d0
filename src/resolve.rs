//! Read-through resolution across both tiers.
//!
//! Hot is always consulted first and wins when a record is briefly in both
//! tiers. Cold is only read after a definite hot miss. A store that cannot
//! answer is an error, never a `NotFound`.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::codec;
use crate::keys::ColdKeyScheme;
use crate::record::{RecordKey, ResolvedRecord, Tier};
use crate::retry::{with_policy, RetryConfig};
use crate::store::{ColdStore, HotStore, StoreError};

/// Default per-call timeout for reads.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(ResolvedRecord),
    /// Absent from both tiers.
    NotFound,
}

impl ReadOutcome {
    pub fn found(self) -> Option<ResolvedRecord> {
        match self {
            ReadOutcome::Found(resolved) => Some(resolved),
            ReadOutcome::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadOutcome::NotFound)
    }
}

/// The resolver could not tell whether the record exists.
#[derive(Debug)]
pub enum ResolveError {
    Hot(StoreError),
    Cold(StoreError),
    /// A cold blob exists but is unreadable or belongs to another id.
    Corrupt { key: String, reason: String },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Hot(e) => write!(f, "hot store read failed: {}", e),
            ResolveError::Cold(e) => write!(f, "cold store read failed: {}", e),
            ResolveError::Corrupt { key, reason } => {
                write!(f, "cold blob {} is corrupt: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

impl ResolveError {
    /// True for "cannot tell right now" failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        use crate::retry::IsRetryable;
        match self {
            ResolveError::Hot(e) | ResolveError::Cold(e) => e.is_retryable(),
            ResolveError::Corrupt { .. } => false,
        }
    }
}

/// Stateless resolver; share it freely across tasks.
#[derive(Clone)]
pub struct ReadResolver {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    key_scheme: ColdKeyScheme,
    op_timeout: Duration,
    retry: RetryConfig,
}

impl ReadResolver {
    pub fn new(hot: Arc<dyn HotStore>, cold: Arc<dyn ColdStore>, key_scheme: ColdKeyScheme) -> Self {
        Self {
            hot,
            cold,
            key_scheme,
            op_timeout: DEFAULT_READ_TIMEOUT,
            retry: RetryConfig::none(),
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub async fn resolve(
        &self,
        id: &str,
        partition_key: &str,
    ) -> Result<ReadOutcome, ResolveError> {
        let key = RecordKey::new(id, partition_key);

        let hot = with_policy(&self.retry, self.op_timeout, || self.hot.get(&key))
            .await
            .map_err(ResolveError::Hot)?;
        if let Some(record) = hot {
            return Ok(ReadOutcome::Found(ResolvedRecord {
                tier: Tier::Hot,
                record,
            }));
        }

        let cold_key = self.key_scheme.key_for(id);
        let blob = with_policy(&self.retry, self.op_timeout, || self.cold.get(&cold_key))
            .await
            .map_err(ResolveError::Cold)?;
        let Some(blob) = blob else {
            debug!(id, partition = partition_key, "record not found in either tier");
            return Ok(ReadOutcome::NotFound);
        };

        let record = codec::decode(&blob).map_err(|e| ResolveError::Corrupt {
            key: cold_key.clone(),
            reason: e.to_string(),
        })?;
        if record.id != id {
            return Err(ResolveError::Corrupt {
                key: cold_key,
                reason: format!("blob holds id '{}'", record.id),
            });
        }

        Ok(ReadOutcome::Found(ResolvedRecord {
            tier: Tier::Cold,
            record,
        }))
    }
}

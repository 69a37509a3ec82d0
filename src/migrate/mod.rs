//! Hot to cold migration engine.
//!
//! A pass selects the oldest eligible records and runs each through a
//! strictly sequential pipeline: read hot, write cold, confirm cold,
//! delete hot. The hot copy is never removed before the cold write has
//! been confirmed. Every step is idempotent, so overlapping or repeated
//! passes need no lock.

use futures::future;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::BlobCodec;
use crate::config::{validate_batch_limit, validate_cutoff, ConfigError, MigrationSettings};
use crate::record::{now_ms, RecordKey};
use crate::retry::with_policy;
use crate::store::{ColdStore, HotStore, StoreError};

mod report;

pub use report::{
    FailureReason, MigrationCandidate, MigrationOutcome, MigrationReport, RecordOutcome,
    SkipReason,
};

/// Pass-level failure. Per-record problems never surface here.
#[derive(Debug)]
pub enum MigrationError {
    Config(ConfigError),
    /// The eligibility query itself failed; nothing was touched.
    Select(StoreError),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Config(e) => write!(f, "configuration error: {}", e),
            MigrationError::Select(e) => write!(f, "candidate selection failed: {}", e),
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<ConfigError> for MigrationError {
    fn from(e: ConfigError) -> Self {
        MigrationError::Config(e)
    }
}

/// Cooperative cancellation for a pass. Clones share the same flag.
///
/// Once cancelled (explicitly or by deadline) no new record pipeline
/// starts; pipelines already running finish every step they began.
#[derive(Debug, Clone, Default)]
pub struct PassControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl PassControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_time_budget(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

pub struct MigrationEngine {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    settings: MigrationSettings,
    codec: BlobCodec,
}

impl MigrationEngine {
    pub fn new(
        hot: Arc<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
        settings: MigrationSettings,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            hot,
            cold,
            codec: BlobCodec::new(settings.compress),
            settings,
        })
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Run a pass with the configured cutoff age and batch limit.
    pub async fn run_configured_pass(
        &self,
        control: &PassControl,
    ) -> Result<MigrationReport, MigrationError> {
        self.run_pass(self.settings.cutoff_age, self.settings.batch_limit, control)
            .await
    }

    /// Migrate up to `batch_limit` records older than `now - cutoff_age`,
    /// oldest first.
    #[tracing::instrument(
        name = "migration_pass",
        skip(self, cutoff_age, control),
        fields(cutoff_age_secs = cutoff_age.as_secs())
    )]
    pub async fn run_pass(
        &self,
        cutoff_age: Duration,
        batch_limit: usize,
        control: &PassControl,
    ) -> Result<MigrationReport, MigrationError> {
        validate_cutoff(cutoff_age)?;
        validate_batch_limit(batch_limit)?;

        let cutoff_ms = now_ms().saturating_sub(cutoff_age.as_millis() as i64);

        let mut selected = self
            .call(|| self.hot.query_older_than(cutoff_ms, batch_limit))
            .await
            .map_err(MigrationError::Select)?;
        selected.truncate(batch_limit);

        let candidates: Vec<MigrationCandidate> = selected
            .iter()
            .map(|record| MigrationCandidate::new(record, cutoff_ms))
            .collect();
        let total = candidates.len();
        debug!(cutoff_ms, selected = total, "selected migration candidates");

        let mut processed: Vec<(usize, RecordOutcome)> =
            stream::iter(candidates.into_iter().enumerate())
                .take_while(|_| future::ready(!control.is_cancelled()))
                .map(|(idx, candidate)| async move {
                    (idx, self.migrate_one(candidate, cutoff_ms).await)
                })
                .buffer_unordered(self.settings.concurrency)
                .collect()
                .await;
        processed.sort_by_key(|(idx, _)| *idx);

        let outcomes: Vec<RecordOutcome> = processed.into_iter().map(|(_, o)| o).collect();
        let cancelled = outcomes.len() < total;
        let report = MigrationReport::from_outcomes(cutoff_ms, total, outcomes, cancelled);

        info!(
            status = report.status,
            selected = report.selected,
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            not_started = report.not_started,
            inconsistent = report.inconsistent.len(),
            "migration pass finished"
        );
        Ok(report)
    }

    /// One record's pipeline. Steps run strictly in order.
    async fn migrate_one(&self, candidate: MigrationCandidate, cutoff_ms: i64) -> RecordOutcome {
        let key = candidate.key;
        let outcome = self.pipeline(&key, cutoff_ms).await;

        match &outcome {
            MigrationOutcome::Migrated => {
                debug!(id = %key.id, partition = %key.partition_key, "record migrated");
            }
            MigrationOutcome::Skipped(reason) => {
                debug!(id = %key.id, partition = %key.partition_key, reason = ?reason, "record skipped");
            }
            MigrationOutcome::Failed(reason) if reason.leaves_duplicate() => {
                warn!(
                    id = %key.id,
                    partition = %key.partition_key,
                    inconsistent = true,
                    error = %reason,
                    "record present in both tiers until the next pass"
                );
            }
            MigrationOutcome::Failed(reason) => {
                warn!(id = %key.id, partition = %key.partition_key, error = %reason, "record migration failed");
            }
        }

        RecordOutcome {
            id: key.id,
            partition_key: key.partition_key,
            outcome,
        }
    }

    async fn pipeline(&self, key: &RecordKey, cutoff_ms: i64) -> MigrationOutcome {
        // 1. Read the full record from the hot tier.
        let record = match self.call(|| self.hot.get(key)).await {
            Ok(Some(record)) => record,
            Ok(None) => return MigrationOutcome::Skipped(SkipReason::Vanished),
            Err(e) => return MigrationOutcome::Failed(FailureReason::HotRead(e.to_string())),
        };
        if !record.is_older_than(cutoff_ms) {
            return MigrationOutcome::Skipped(SkipReason::NoLongerEligible);
        }

        // 2. Upsert under the id-derived cold key.
        let blob = match self.codec.encode(&record) {
            Ok(blob) => blob,
            Err(e) => return MigrationOutcome::Failed(FailureReason::Encode(e.to_string())),
        };
        let cold_key = self.settings.key_scheme.key_for(&record.id);
        if let Err(e) = self
            .call(|| self.cold.put(&cold_key, blob.clone()))
            .await
        {
            return MigrationOutcome::Failed(FailureReason::ColdWrite(e.to_string()));
        }

        // 3. Confirm durability. `put` returning Ok is the baseline signal.
        if self.settings.verify_read_back {
            match self.call(|| self.cold.get(&cold_key)).await {
                Ok(Some(stored)) if stored == blob => {}
                Ok(Some(_)) => {
                    return MigrationOutcome::Failed(FailureReason::ColdVerify(format!(
                        "content under {} differs from what was written",
                        cold_key
                    )))
                }
                Ok(None) => {
                    return MigrationOutcome::Failed(FailureReason::ColdVerify(format!(
                        "{} missing after write",
                        cold_key
                    )))
                }
                Err(e) => {
                    return MigrationOutcome::Failed(FailureReason::ColdVerify(e.to_string()))
                }
            }
        }

        // 4. Only now may the hot copy go.
        if let Err(e) = self.call(|| self.hot.delete(key)).await {
            return MigrationOutcome::Failed(FailureReason::HotDelete(e.to_string()));
        }

        MigrationOutcome::Migrated
    }

    /// Every store call gets the per-operation timeout and bounded retries.
    async fn call<T, F, Fut>(&self, call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        with_policy(&self.settings.retry, self.settings.op_timeout, call).await
    }
}

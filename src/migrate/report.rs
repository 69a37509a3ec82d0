//! Per-record outcomes and the pass report.

use serde::Serialize;
use std::time::Duration;

use crate::record::{Record, RecordKey};

/// An eligible record selected for this pass. Lives only for the pass.
#[derive(Debug, Clone)]
pub struct MigrationCandidate {
    pub key: RecordKey,
    pub timestamp_ms: i64,
    /// How far past the cutoff the record was when selected.
    pub past_cutoff: Duration,
}

impl MigrationCandidate {
    pub fn new(record: &Record, cutoff_ms: i64) -> Self {
        let past_ms = cutoff_ms.saturating_sub(record.timestamp_ms).max(0) as u64;
        Self {
            key: record.key(),
            timestamp_ms: record.timestamp_ms,
            past_cutoff: Duration::from_millis(past_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Gone from the hot store before it could be read.
    Vanished,
    /// Rewritten after selection; its new timestamp is inside the cutoff.
    NoLongerEligible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    HotRead(String),
    Encode(String),
    ColdWrite(String),
    ColdVerify(String),
    /// The cold copy is durable but the hot copy survived; the record is in both tiers.
    HotDelete(String),
}

impl FailureReason {
    /// True when the record now exists in both tiers.
    pub fn leaves_duplicate(&self) -> bool {
        matches!(self, FailureReason::HotDelete(_))
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::HotRead(e) => write!(f, "hot read failed: {}", e),
            FailureReason::Encode(e) => write!(f, "encode failed: {}", e),
            FailureReason::ColdWrite(e) => write!(f, "cold write failed: {}", e),
            FailureReason::ColdVerify(e) => write!(f, "cold verify failed: {}", e),
            FailureReason::HotDelete(e) => write!(f, "hot delete failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated,
    Skipped(SkipReason),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub id: String,
    pub partition_key: String,
    #[serde(flatten)]
    pub outcome: MigrationOutcome,
}

/// Result of one migration pass. Partial success is reported, not raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub status: &'static str,
    pub cutoff_ms: i64,
    pub selected: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Selected but never started because the pass was cancelled.
    pub not_started: usize,
    pub cancelled: bool,
    /// Ids whose hot delete failed after a durable cold write.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inconsistent: Vec<String>,
    pub outcomes: Vec<RecordOutcome>,
}

impl MigrationReport {
    pub(crate) fn from_outcomes(
        cutoff_ms: i64,
        selected: usize,
        outcomes: Vec<RecordOutcome>,
        cancelled: bool,
    ) -> Self {
        let mut report = Self {
            cutoff_ms,
            selected,
            not_started: selected.saturating_sub(outcomes.len()),
            cancelled,
            ..Self::default()
        };

        for record in &outcomes {
            match &record.outcome {
                MigrationOutcome::Migrated => report.migrated += 1,
                MigrationOutcome::Skipped(_) => report.skipped += 1,
                MigrationOutcome::Failed(reason) => {
                    report.failed += 1;
                    if reason.leaves_duplicate() {
                        report.inconsistent.push(record.id.clone());
                    }
                }
            }
        }

        report.status = if report.failed == 0 {
            if cancelled {
                "cancelled"
            } else {
                "ok"
            }
        } else if report.migrated == 0 {
            "error"
        } else {
            "partial"
        };
        report.outcomes = outcomes;
        report
    }

    /// Failed records with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FailureReason)> {
        self.outcomes.iter().filter_map(|r| match &r.outcome {
            MigrationOutcome::Failed(reason) => Some((r.id.as_str(), reason)),
            _ => None,
        })
    }

    /// Outcome for a given id, if it was processed in this pass.
    pub fn outcome_for(&self, id: &str) -> Option<&MigrationOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.id == id)
            .map(|r| &r.outcome)
    }

    pub fn migrated_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|r| r.outcome == MigrationOutcome::Migrated)
            .map(|r| r.id.as_str())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

// src/lib.rs
//! Moves aging records from a hot store into a cold archive and resolves
//! reads across both tiers.

pub mod cli;
pub mod codec;
pub mod config;
pub mod keys;
pub mod migrate;
pub mod native;
pub mod record;
pub mod resolve;
pub mod retry;
pub mod store;

pub use config::{Config, ConfigError, MigrationSettings, ReadSettings};
pub use keys::ColdKeyScheme;
pub use migrate::{
    FailureReason, MigrationEngine, MigrationError, MigrationOutcome, MigrationReport,
    PassControl, SkipReason,
};
pub use record::{Record, RecordKey, ResolvedRecord, Tier};
pub use resolve::{ReadOutcome, ReadResolver, ResolveError};
pub use store::{ColdStore, HotStore, StoreError};

// Re-export tracing for use in other modules
pub use tracing;

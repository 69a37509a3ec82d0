//! TOML configuration and validation.
//!
//! Raw values are read as optional and checked once by
//! [`Config::settings`]; everything downstream works with the validated
//! [`MigrationSettings`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::keys::ColdKeyScheme;
use crate::retry::RetryConfig;

pub const CONFIG_FILENAME: &str = ".frostbit.toml";

const MAX_CUTOFF_DAYS: u64 = 36_500;
const MAX_BATCH_LIMIT: usize = 100_000;
const MAX_CONCURRENCY: usize = 256;
const MAX_RETRY_DELAY_MS: u64 = 10_000;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Missing or invalid configuration. Fatal: no pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(field) => write!(f, "missing required setting '{}'", field),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid setting '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub migration: MigrationSection,
    #[serde(default)]
    pub cold_keys: ColdKeyScheme,
    #[serde(default)]
    pub hot: HotBackend,
    #[serde(default)]
    pub cold: ColdBackend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationSection {
    pub cutoff_age_days: Option<u64>,
    pub batch_limit: Option<usize>,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default)]
    pub verify_read_back: bool,
    #[serde(default)]
    pub compress: bool,
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

fn default_concurrency() -> usize {
    8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HotBackend {
    Fs { path: PathBuf },
    Memory,
}

impl Default for HotBackend {
    fn default() -> Self {
        HotBackend::Fs {
            path: PathBuf::from("./data/hot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColdBackend {
    Fs {
        path: PathBuf,
    },
    Http {
        url: String,
        /// Name of the environment variable holding the bearer token.
        #[serde(default)]
        token_env: Option<String>,
    },
    Memory,
}

impl Default for ColdBackend {
    fn default() -> Self {
        ColdBackend::Fs {
            path: PathBuf::from("./data/cold"),
        }
    }
}

/// Validated engine settings.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub cutoff_age: Duration,
    pub batch_limit: usize,
    pub op_timeout: Duration,
    pub concurrency: usize,
    pub retry: RetryConfig,
    pub verify_read_back: bool,
    pub compress: bool,
    pub key_scheme: ColdKeyScheme,
}

impl MigrationSettings {
    /// Settings with sane defaults for the given cutoff and batch size.
    pub fn new(cutoff_age: Duration, batch_limit: usize) -> Self {
        Self {
            cutoff_age,
            batch_limit,
            op_timeout: Duration::from_millis(default_op_timeout_ms()),
            concurrency: default_concurrency(),
            retry: RetryConfig::exponential(
                default_max_attempts(),
                default_retry_base_ms(),
                MAX_RETRY_DELAY_MS,
            ),
            verify_read_back: false,
            compress: false,
            key_scheme: ColdKeyScheme::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cutoff(self.cutoff_age)?;
        validate_batch_limit(self.batch_limit)?;
        if self.op_timeout.is_zero() {
            return Err(ConfigError::invalid("migration.op_timeout_ms", "must be > 0"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::invalid(
                "migration.concurrency",
                format!("must be between 1 and {}", MAX_CONCURRENCY),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("migration.max_attempts", "must be >= 1"));
        }
        self.key_scheme.validate()
    }
}

/// Validated settings for the read path. Migration-only values are not needed.
#[derive(Debug, Clone)]
pub struct ReadSettings {
    pub op_timeout: Duration,
    pub retry: RetryConfig,
    pub key_scheme: ColdKeyScheme,
}

pub(crate) fn validate_cutoff(cutoff_age: Duration) -> Result<(), ConfigError> {
    if cutoff_age.is_zero() {
        return Err(ConfigError::invalid(
            "migration.cutoff_age_days",
            "must be > 0",
        ));
    }
    if cutoff_age > DAY * MAX_CUTOFF_DAYS as u32 {
        return Err(ConfigError::invalid(
            "migration.cutoff_age_days",
            format!("must be at most {} days", MAX_CUTOFF_DAYS),
        ));
    }
    Ok(())
}

pub(crate) fn validate_batch_limit(batch_limit: usize) -> Result<(), ConfigError> {
    if batch_limit == 0 || batch_limit > MAX_BATCH_LIMIT {
        return Err(ConfigError::invalid(
            "migration.batch_limit",
            format!("must be between 1 and {}, got {}", MAX_BATCH_LIMIT, batch_limit),
        ));
    }
    Ok(())
}

impl Config {
    pub fn load() -> Result<Self> {
        load_config_from_path(CONFIG_FILENAME)
    }

    /// Validate only what resolving a record needs: timeouts, retries and
    /// the cold key scheme.
    pub fn read_settings(&self) -> Result<ReadSettings, ConfigError> {
        let m = &self.migration;
        if m.op_timeout_ms == 0 {
            return Err(ConfigError::invalid("migration.op_timeout_ms", "must be > 0"));
        }
        if m.max_attempts == 0 {
            return Err(ConfigError::invalid("migration.max_attempts", "must be >= 1"));
        }
        self.cold_keys.validate()?;
        Ok(ReadSettings {
            op_timeout: Duration::from_millis(m.op_timeout_ms),
            retry: RetryConfig::exponential(m.max_attempts, m.retry_base_ms, MAX_RETRY_DELAY_MS),
            key_scheme: self.cold_keys.clone(),
        })
    }

    /// Validate and convert the `[migration]` and `[cold_keys]` sections.
    pub fn settings(&self) -> Result<MigrationSettings, ConfigError> {
        let m = &self.migration;
        let days = m
            .cutoff_age_days
            .ok_or(ConfigError::Missing("migration.cutoff_age_days"))?;
        if days > MAX_CUTOFF_DAYS {
            return Err(ConfigError::invalid(
                "migration.cutoff_age_days",
                format!("must be at most {} days", MAX_CUTOFF_DAYS),
            ));
        }
        let batch_limit = m
            .batch_limit
            .ok_or(ConfigError::Missing("migration.batch_limit"))?;

        let settings = MigrationSettings {
            cutoff_age: DAY * days as u32,
            batch_limit,
            op_timeout: Duration::from_millis(m.op_timeout_ms),
            concurrency: m.concurrency,
            retry: RetryConfig::exponential(
                m.max_attempts,
                m.retry_base_ms,
                MAX_RETRY_DELAY_MS,
            ),
            verify_read_back: m.verify_read_back,
            compress: m.compress,
            key_scheme: self.cold_keys.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
    Ok(config)
}

pub mod commands;
pub mod stores;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILENAME;

#[derive(Parser)]
#[command(name = "frostbit")]
#[command(about = "Archive aging records to cold storage and read across both tiers")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "FROSTBIT_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one migration pass and print its report
    Migrate(MigrateArgs),
    /// Resolve a record from whichever tier holds it
    Get(GetArgs),
    /// Validate configuration and print effective settings
    Check(CheckArgs),
}

#[derive(clap::Args)]
pub struct ConfigArg {
    /// Path to the TOML config file
    #[arg(long, short = 'c', default_value = CONFIG_FILENAME, env = "FROSTBIT_CONFIG")]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Override the configured cutoff age in days
    #[arg(long)]
    pub cutoff_days: Option<u64>,

    /// Override the configured batch limit
    #[arg(long)]
    pub batch_limit: Option<usize>,

    /// Stop starting new records after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

#[derive(clap::Args)]
pub struct GetArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Record id
    pub id: String,

    /// Partition key used for hot-store addressing
    pub partition_key: String,
}

#[derive(clap::Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

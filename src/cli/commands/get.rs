use anyhow::{Context, Result};
use std::process::ExitCode;

use crate::cli::stores::{build_cold_store, build_hot_store};
use crate::cli::GetArgs;
use crate::config::load_config_from_path;
use crate::resolve::{ReadOutcome, ReadResolver};

/// Exit code when the record exists in neither tier.
const EXIT_NOT_FOUND: u8 = 2;

pub async fn execute_get(args: GetArgs) -> Result<ExitCode> {
    let config = load_config_from_path(&args.config.config)?;
    let settings = config.read_settings().context("Invalid configuration")?;

    let hot = build_hot_store(&config.hot);
    let cold = build_cold_store(&config.cold, settings.op_timeout)?;
    let resolver = ReadResolver::new(hot, cold, settings.key_scheme)
        .with_timeout(settings.op_timeout)
        .with_retry(settings.retry);

    let outcome = resolver
        .resolve(&args.id, &args.partition_key)
        .await
        .with_context(|| format!("Could not resolve {} right now", args.id))?;

    match outcome {
        ReadOutcome::Found(resolved) => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(ExitCode::SUCCESS)
        }
        ReadOutcome::NotFound => {
            eprintln!(
                "Record {} (partition {}) not found in either tier",
                args.id, args.partition_key
            );
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
    }
}

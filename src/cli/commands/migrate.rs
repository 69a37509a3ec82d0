use anyhow::{Context, Result};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::stores::{build_cold_store, build_hot_store};
use crate::cli::MigrateArgs;
use crate::config::load_config_from_path;
use crate::migrate::{MigrationEngine, PassControl};

pub async fn execute_migrate(args: MigrateArgs) -> Result<ExitCode> {
    let mut config = load_config_from_path(&args.config.config)?;
    if let Some(days) = args.cutoff_days {
        config.migration.cutoff_age_days = Some(days);
    }
    if let Some(limit) = args.batch_limit {
        config.migration.batch_limit = Some(limit);
    }
    let settings = config.settings().context("Invalid configuration")?;

    let hot = build_hot_store(&config.hot);
    let cold = build_cold_store(&config.cold, settings.op_timeout)?;
    let engine = MigrationEngine::new(hot, cold, settings)?;

    let mut control = PassControl::new();
    if let Some(secs) = args.deadline_secs {
        control = control.with_time_budget(Duration::from_secs(secs));
    }

    let interrupt = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight records");
            interrupt.cancel();
        }
    });

    info!(
        cutoff_days = engine.settings().cutoff_age.as_secs() / 86_400,
        batch_limit = engine.settings().batch_limit,
        concurrency = engine.settings().concurrency,
        "starting migration pass"
    );
    let report = engine.run_configured_pass(&control).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

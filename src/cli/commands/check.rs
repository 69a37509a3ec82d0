use anyhow::{Context, Result};

use crate::cli::CheckArgs;
use crate::config::{load_config_from_path, ColdBackend, HotBackend};
use crate::keys::ColdKeyScheme;

pub fn execute_check(args: CheckArgs) -> Result<()> {
    let config = load_config_from_path(&args.config.config)?;
    let settings = config.settings().context("Invalid configuration")?;

    println!("==> Configuration OK: {}", args.config.config.display());
    println!("    cutoff age:       {} days", settings.cutoff_age.as_secs() / 86_400);
    println!("    batch limit:      {}", settings.batch_limit);
    println!("    op timeout:       {}ms", settings.op_timeout.as_millis());
    println!("    concurrency:      {}", settings.concurrency);
    println!("    max attempts:     {}", settings.retry.max_attempts);
    println!("    verify read-back: {}", settings.verify_read_back);
    println!("    compress:         {}", settings.compress);

    match &settings.key_scheme {
        ColdKeyScheme::Flat { prefix } => println!("    cold keys:        {}/<id>", prefix),
        ColdKeyScheme::Sharded { prefix, shards } => {
            println!("    cold keys:        {}/<shard of {}>/<id>", prefix, shards)
        }
    }

    match &config.hot {
        HotBackend::Fs { path } => println!("    hot store:        fs {}", path.display()),
        HotBackend::Memory => println!("    hot store:        memory"),
    }
    match &config.cold {
        ColdBackend::Fs { path } => println!("    cold store:       fs {}", path.display()),
        ColdBackend::Http { url, token_env } => println!(
            "    cold store:       http {} (token: {})",
            url,
            token_env.as_deref().unwrap_or("none")
        ),
        ColdBackend::Memory => println!("    cold store:       memory"),
    }

    Ok(())
}

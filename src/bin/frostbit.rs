use clap::Parser;
use std::process::ExitCode;

use frostbit::cli::{commands, Cli, Commands};
use frostbit::native::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Migrate(args) => commands::execute_migrate(args).await,
        Commands::Get(args) => commands::execute_get(args).await,
        Commands::Check(args) => {
            commands::execute_check(args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

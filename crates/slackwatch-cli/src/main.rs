mod bootstrap_helpers;
mod cli_args;
mod runtime_cli_validation;

use anyhow::Result;
use clap::Parser;
use slackwatch_runtime::{run_slack_watch, ShutdownSignal};
use tracing::info;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::runtime_cli_validation::{build_runtime_config, validate_cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    validate_cli(&cli)?;
    let config = build_runtime_config(&cli);

    let (shutdown_tx, shutdown) = ShutdownSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("slackwatch shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    run_slack_watch(config, shutdown).await
}

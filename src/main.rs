#![allow(dead_code)]
// Used to get build time information
use shadow_rs::shadow;
shadow!(build);

mod cli;
mod config;
mod http;
mod logging;
mod metrics;
mod types;
mod version;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands, RunArgs};
use crate::config::SystemConfig;
use crate::types::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load the config early for logging setup; commands that need it report
    // load errors themselves
    let system_config = match &cli.command {
        Some(Commands::Version) => None,
        _ => SystemConfig::load_or_default(cli.config.as_ref()).ok(),
    };

    crate::logging::init(
        cli.log_level_override(),
        cli.log_format_override(),
        system_config.as_ref(),
    )?;

    crate::metrics::init_metrics();

    info!(build_tag = crate::version::build_tag(), "Starting Gatehouse");

    match cli
        .command
        .clone()
        .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    {
        Commands::Run(args) => cli::run_server(cli, args, system_config).await,
        Commands::Validate => cli::validate_config(cli, system_config).await,
        Commands::Version => cli::show_version().await,
    }
}

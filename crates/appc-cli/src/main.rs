//! appc - application creator CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appc_cli::cmd;
use appc_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let common = cmd::Common {
        config: cli.config.as_deref(),
        defines: &cli.defines,
        json: cli.json,
    };
    match &cli.command {
        Commands::Curate { app_jar } => cmd::curate::curate(&common, app_jar.as_deref()),
        Commands::Build(args) => cmd::build::build(&common, args),
        Commands::PersistState { app_jar } => cmd::state::persist_state(&common, app_jar.as_deref()),
    }
}

mod cli;
mod commands;
mod config;
mod render;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.connection.config {
        Some(path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    config.apply(&cli.connection);

    match cli.command {
        Command::Upload(args) => commands::upload::execute(&config, args).await,
        Command::Items { share } => commands::items::execute(&config, &share).await,
    }
}

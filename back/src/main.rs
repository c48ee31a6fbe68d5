use anyhow::Result;
use arcade_back::BackConfig;
use clap::Parser;
use std::path::PathBuf;

/// Serves the game library to arcade clients.
#[derive(Debug, Parser)]
#[command(name = "arcade-back", version)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    arcade_back::logging::init("info");
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => BackConfig::load(&path)?,
        None => BackConfig::default(),
    };
    arcade_back::run(config).await
}

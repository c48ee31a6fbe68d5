use anyhow::Result;
use arcade_back::BackConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct ServeCommand {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub async fn run_serve(cmd: ServeCommand) -> Result<()> {
    let config = match cmd.config {
        Some(path) => BackConfig::load(&path)?,
        None => BackConfig::default(),
    };
    arcade_back::run(config).await
}

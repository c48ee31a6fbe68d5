use anyhow::Result;
use arcade_cli::BrowseCommand;
use arcade_cli::ServeCommand;
use clap::Parser;
use clap::Subcommand;

/// Game library browser backed by the arcade back process.
#[derive(Debug, Parser)]
#[command(name = "arcade", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the back in the foreground.
    Serve(ServeCommand),
    /// Search a running back and print one range of results.
    Browse(BrowseCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => {
            arcade_back::logging::init("info");
            arcade_cli::run_serve(cmd).await
        }
        Command::Browse(cmd) => {
            arcade_back::logging::init("warn");
            arcade_cli::run_browse(cmd).await
        }
    }
}

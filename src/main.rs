//! Medirec CLI entry point.

use clap::Parser;

use medirec::cli::{self, Cli, Commands};
use medirec::infrastructure::config::Config;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let config = match args.config.as_ref() {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => cli::handle_error(err.into()),
    };

    cli::init_logging(&config.logging);

    let result = match args.command {
        Commands::Ingest(cmd) => cli::commands::ingest::execute(cmd, &config).await,
        Commands::Recommend(cmd) => cli::commands::recommend::execute(cmd, &config).await,
    };

    if let Err(err) = result {
        cli::handle_error(err);
    }
}

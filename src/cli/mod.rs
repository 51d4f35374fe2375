//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::infrastructure::config::LoggingSection;

/// Health-check package recommender.
#[derive(Debug, Parser)]
#[command(name = "medirec", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an explicit config file (defaults to ./medirec.yaml).
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the vector indexes from source files (offline batch job).
    Ingest(commands::ingest::IngestArgs),

    /// Run one recommendation session for a user profile.
    Recommend(commands::recommend::RecommendArgs),
}

/// Initialize tracing from the logging config.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(logging: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    let fmt_layer = if logging.format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Report a fatal error and exit non-zero.
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("error: {err:#}");
    std::process::exit(1);
}

//! tapa: HTTP load testing from the command line.

use anyhow::Result;
use clap::Parser;

mod commands;

/// Replay an HTTP request across concurrent virtual users
#[derive(Parser)]
#[command(name = "tapa")]
#[command(about = "Load test an HTTP endpoint with concurrent virtual users", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> Result<()> {
    #[cfg(feature = "logging")]
    init_logging();

    let cli = Cli::parse();
    cli.command.execute()
}

/// Install the stderr log subscriber (`RUST_LOG`, default `tapa=info`).
#[cfg(feature = "logging")]
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tapa=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

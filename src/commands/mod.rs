//! `tapa` CLI subcommands.
//!
//! Provides `run` (execute a load test) and `init` (generate starter config).

mod init;
mod run;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

/// Load test commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test
    ///
    /// Uses .tapa/loadtest.toml (or a custom config path) and applies any
    /// flags on top. With no config file, a URL is enough to run a single
    /// GET. Reports results to the terminal and writes a JSON report to
    /// .tapa/reports/.
    Run {
        /// Target URL (overrides the config's request URL)
        url: Option<String>,

        /// Path to config file (default: auto-discover .tapa/loadtest.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: run::RunOverrides,

        /// Disable JSON report output
        #[arg(long)]
        no_report: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Generate a starter loadtest config file
    ///
    /// Creates .tapa/loadtest.toml with sensible defaults, targeting URL if
    /// one is given.
    Init {
        /// Target URL to write into the config
        url: Option<String>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    /// Execute the selected subcommand.
    pub fn execute(self) -> Result<()> {
        match self {
            Command::Run {
                url,
                config,
                overrides,
                no_report,
                no_color,
                no_progress,
            } => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(
                    url,
                    config,
                    overrides,
                    no_report,
                    no_color,
                    no_progress,
                ))
            },
            Command::Init { url, force } => init::execute_init(url, force),
        }
    }
}

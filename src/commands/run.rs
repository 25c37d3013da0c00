//! `tapa run` command implementation.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tapa::loadtest::config::{ExpectationConfig, LoadTestConfig, RequestConfig, Settings};
use tapa::loadtest::metrics::LatencyStats;
use tapa::loadtest::progress::{NoProgress, ProgressBarSink, ProgressSink};
use tapa::loadtest::report::{write_report, LoadTestReport};
use tapa::loadtest::session::Session;
use tapa::loadtest::summary::{render_summary, SummaryContext};
use tapa::loadtest::transport::HttpTransport;

/// CLI flags that override config file values.
#[derive(Debug, Default, Clone, Args)]
pub struct RunOverrides {
    /// Number of virtual users (overrides config)
    #[arg(long, short = 'u')]
    pub users: Option<u32>,

    /// Requests per virtual user (overrides config)
    #[arg(long, short = 'n')]
    pub requests_per_user: Option<u32>,

    /// Minimum delay before each request, in milliseconds
    #[arg(long)]
    pub delay_min: Option<u64>,

    /// Maximum delay before each request, in milliseconds
    #[arg(long)]
    pub delay_max: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Display name for the run
    #[arg(long)]
    pub name: Option<String>,

    /// Require every response to have this status code
    #[arg(long)]
    pub expect_status: Option<u16>,
}

/// Execute the `run` command.
///
/// Loads config (explicit path, auto-discovery, or URL-only defaults),
/// applies CLI overrides, runs the batch, prints the summary, and writes the
/// JSON report.
pub async fn execute_run(
    url: Option<String>,
    config_path: Option<PathBuf>,
    overrides: RunOverrides,
    no_report: bool,
    no_color: bool,
    no_progress: bool,
) -> Result<()> {
    // Step 1: Load config
    let mut config = match resolve_config_path(config_path)? {
        Some(path) => {
            eprintln!("Loading config from: {}", path.display());
            LoadTestConfig::load(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path.display(), e))?
        },
        None => match &url {
            Some(url) => url_only_config(url),
            None => anyhow::bail!(
                "No loadtest config found and no URL given.\n\
                 Run `tapa init` to create .tapa/loadtest.toml,\n\
                 use `--config path/to/file.toml`, or pass a URL."
            ),
        },
    };

    // Step 2: Apply CLI overrides and re-validate
    apply_overrides(&mut config, url, &overrides);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid load test settings: {}", e))?;

    // Step 3: Build the session
    let transport = Arc::new(HttpTransport::new(config.timeout())?);
    let mut session = Session::from_config(&config, transport)?;
    let progress: Arc<dyn ProgressSink> = if no_progress {
        Arc::new(NoProgress)
    } else {
        Arc::new(ProgressBarSink::new(session.name()))
    };
    session = session.with_progress(progress);

    // Step 4: Run with Ctrl+C cancellation
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn(handle_ctrl_c(cancel.clone()));
    let report = session.run_with_cancel(cancel).await;
    ctrl_c.abort();

    // Step 5: Terminal summary
    if no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    let stats = LatencyStats::from_report(&report);
    let context = SummaryContext {
        name: session.name(),
        users: session.users(),
        requests_per_user: session.requests_per_user(),
        delay: session.delay(),
    };
    println!("{}", render_summary(&stats, &context));

    // Step 6: JSON report (unless --no-report)
    if !no_report {
        let json_report = LoadTestReport::from_stats(&stats, &session);
        let cwd = std::env::current_dir()?;
        match write_report(&json_report, &cwd) {
            Ok(path) => {
                eprintln!();
                eprintln!("Report written to: {}", path.display());
            },
            Err(e) => {
                eprintln!();
                eprintln!("Warning: Failed to write report: {}", e);
            },
        }
    }

    Ok(())
}

/// Picks the config file: an explicit path must exist; otherwise discover.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\nUse `tapa init` to create one.",
                    path.display()
                );
            }
            Ok(Some(path))
        },
        None => Ok(std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))),
    }
}

/// A single-user, single-request GET against `url`.
fn url_only_config(url: &str) -> LoadTestConfig {
    LoadTestConfig {
        settings: Settings {
            users: 1,
            requests_per_user: 1,
            delay_min_ms: 0,
            delay_max_ms: 0,
            timeout_ms: 30_000,
            name: None,
        },
        request: RequestConfig {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: BTreeMap::new(),
            body: None,
        },
        expectation: Vec::new(),
    }
}

/// Apply CLI flag overrides to a loaded config.
fn apply_overrides(config: &mut LoadTestConfig, url: Option<String>, overrides: &RunOverrides) {
    if let Some(url) = url {
        config.request.url = url;
    }
    let settings = &mut config.settings;
    if let Some(users) = overrides.users {
        settings.users = users;
    }
    if let Some(requests) = overrides.requests_per_user {
        settings.requests_per_user = requests;
    }
    if let Some(min) = overrides.delay_min {
        settings.delay_min_ms = min;
        // A lone --delay-min means a fixed delay
        if overrides.delay_max.is_none() && settings.delay_max_ms < min {
            settings.delay_max_ms = min;
        }
    }
    if let Some(max) = overrides.delay_max {
        settings.delay_max_ms = max;
    }
    if let Some(timeout) = overrides.timeout {
        settings.timeout_ms = timeout;
    }
    if let Some(name) = &overrides.name {
        settings.name = Some(name.clone());
    }
    if let Some(code) = overrides.expect_status {
        config.expectation.push(ExpectationConfig::Status { code });
    }
}

/// Discover `.tapa/loadtest.toml` by walking parent directories from `start`.
///
/// Walks up until either the file is found or the filesystem root is
/// reached, matching `.git` directory discovery.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(".tapa").join("loadtest.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// First Ctrl+C cancels the batch; a second one exits immediately.
async fn handle_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nReceived Ctrl+C, stopping gracefully...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nReceived second Ctrl+C, aborting immediately.");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LoadTestConfig {
        let mut config = url_only_config("http://localhost:8080/health");
        config.settings.users = 10;
        config.settings.requests_per_user = 5;
        config
    }

    #[test]
    fn test_url_only_config_is_valid() {
        let config = url_only_config("http://localhost/");
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size(), 1);
    }

    #[test]
    fn test_apply_overrides_counts() {
        let mut config = config();
        let overrides = RunOverrides {
            users: Some(50),
            ..Default::default()
        };
        apply_overrides(&mut config, None, &overrides);
        assert_eq!(config.settings.users, 50);
        assert_eq!(config.settings.requests_per_user, 5);
        assert_eq!(config.request.url, "http://localhost:8080/health");
    }

    #[test]
    fn test_apply_overrides_url_and_name() {
        let mut config = config();
        let overrides = RunOverrides {
            name: Some("smoke".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut config, Some("https://example.com/".to_string()), &overrides);
        assert_eq!(config.request.url, "https://example.com/");
        assert_eq!(config.settings.name.as_deref(), Some("smoke"));
    }

    #[test]
    fn test_apply_overrides_lone_delay_min_is_fixed() {
        let mut config = config();
        let overrides = RunOverrides {
            delay_min: Some(40),
            ..Default::default()
        };
        apply_overrides(&mut config, None, &overrides);
        assert_eq!(config.settings.delay_min_ms, 40);
        assert_eq!(config.settings.delay_max_ms, 40);
    }

    #[test]
    fn test_apply_overrides_delay_range() {
        let mut config = config();
        let overrides = RunOverrides {
            delay_min: Some(10),
            delay_max: Some(50),
            ..Default::default()
        };
        apply_overrides(&mut config, None, &overrides);
        assert_eq!(config.settings.delay_min_ms, 10);
        assert_eq!(config.settings.delay_max_ms, 50);
    }

    #[test]
    fn test_apply_overrides_expect_status_appends() {
        let mut config = config();
        let overrides = RunOverrides {
            expect_status: Some(204),
            ..Default::default()
        };
        apply_overrides(&mut config, None, &overrides);
        assert_eq!(config.expectation, vec![ExpectationConfig::Status { code: 204 }]);
    }

    #[test]
    fn test_discover_config_walks_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let tapa_dir = tmp.path().join(".tapa");
        std::fs::create_dir_all(&tapa_dir).unwrap();
        std::fs::write(tapa_dir.join("loadtest.toml"), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover_config(&nested).unwrap();
        assert_eq!(found, tapa_dir.join("loadtest.toml"));
    }

    #[test]
    fn test_resolve_missing_explicit_config_fails() {
        let result = resolve_config_path(Some(PathBuf::from("/nonexistent/loadtest.toml")));
        assert!(result.is_err());
    }
}

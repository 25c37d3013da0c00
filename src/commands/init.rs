//! `tapa init` command implementation.

use anyhow::Result;
use std::path::{Path, PathBuf};

const DEFAULT_URL: &str = "http://localhost:8080/health";

/// Execute the `init` command.
///
/// Creates `.tapa/loadtest.toml` in the current directory with sensible
/// defaults, targeting `url` if given.
pub fn execute_init(url: Option<String>, force: bool) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = write_starter_config(&cwd, url.as_deref(), force)?;
    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to customize your load test.");
    Ok(())
}

/// Writes the starter config under `base_dir/.tapa/`, refusing to overwrite
/// an existing file unless `force` is set.
fn write_starter_config(base_dir: &Path, url: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_dir = base_dir.join(".tapa");
    let config_path = config_dir.join("loadtest.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, generate_default_template(url.unwrap_or(DEFAULT_URL)))?;
    Ok(config_path)
}

/// Starter config with every section present and commented.
fn generate_default_template(url: &str) -> String {
    format!(
        r#"# tapa load test configuration
# Run with: tapa run

[settings]
# Concurrent virtual users
users = 10
# Requests each virtual user sends
requests_per_user = 20
# Think time before each request, drawn from [delay_min_ms, delay_max_ms)
delay_min_ms = 0
delay_max_ms = 100
# Per-request timeout
timeout_ms = 5000

[request]
method = "GET"
url = "{url}"

# [request.headers]
# authorization = "Bearer <token>"

# body = '{{"key": "value"}}'

[[expectation]]
type = "success_status"

# [[expectation]]
# type = "status"
# code = 200

# [[expectation]]
# type = "body_contains"
# text = "ok"

# [[expectation]]
# type = "header"
# name = "content-type"
# value = "application/json"
"#
    )
}

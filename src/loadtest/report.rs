//! JSON report serialization for finished batches.
//!
//! Produces a schema-versioned JSON file holding the latency percentiles,
//! throughput, error breakdown, and the resolved batch configuration, so a
//! CI pipeline can archive or diff runs.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::loadtest::metrics::LatencyStats;
use crate::loadtest::session::Session;

/// Schema version for the JSON report format.
///
/// External tools key on this field to determine parser compatibility.
pub const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON report structure.
#[derive(Debug, Serialize)]
pub struct LoadTestReport {
    /// Report format version for parser compatibility.
    pub schema_version: String,
    /// RFC 3339 timestamp when the report was generated.
    pub timestamp: String,
    /// Session display name.
    pub name: String,
    /// HTTP method of the replayed request.
    pub method: String,
    /// Target URL of the replayed request.
    pub target_url: String,
    /// Wall-clock batch duration in seconds.
    pub duration_secs: f64,
    /// Whether the batch was cancelled before completion.
    pub cancelled: bool,
    pub config: ReportConfig,
    pub metrics: ReportMetrics,
    /// Error counts by category.
    pub errors: BTreeMap<String, u64>,
}

/// Resolved batch configuration embedded in the report.
#[derive(Debug, Serialize)]
pub struct ReportConfig {
    pub users: u32,
    pub requests_per_user: u32,
    pub delay_min_ms: f64,
    pub delay_max_ms: f64,
    /// Number of registered expectations.
    pub expectations: usize,
}

/// Aggregate performance metrics in the report.
#[derive(Debug, Serialize)]
pub struct ReportMetrics {
    pub batch_size: u64,
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Error rate as a fraction (0.0..=1.0).
    pub error_rate: f64,
    pub throughput_rps: f64,
    pub latency: LatencyMetrics,
}

/// Latency breakdown of successful requests, in milliseconds.
#[derive(Debug, Serialize)]
pub struct LatencyMetrics {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

impl LoadTestReport {
    /// Build a report from the session that ran and its statistics.
    pub fn from_stats(stats: &LatencyStats, session: &Session) -> Self {
        let template = session.template();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            name: session.name().to_string(),
            method: template.method().to_string(),
            target_url: template.url().to_string(),
            duration_secs: stats.elapsed.as_secs_f64(),
            cancelled: stats.cancelled,
            config: ReportConfig {
                users: session.users(),
                requests_per_user: session.requests_per_user(),
                delay_min_ms: millis(session.delay().min()),
                delay_max_ms: millis(session.delay().max()),
                expectations: session.expectation_count(),
            },
            metrics: ReportMetrics {
                batch_size: stats.batch_size,
                total_requests: stats.total_requests,
                success_count: stats.success_count,
                error_count: stats.error_count,
                error_rate: stats.error_rate,
                throughput_rps: stats.throughput_rps,
                latency: LatencyMetrics {
                    min_ms: millis(stats.min),
                    mean_ms: millis(stats.mean),
                    max_ms: millis(stats.max),
                    p50_ms: millis(stats.p50),
                    p90_ms: millis(stats.p90),
                    p95_ms: millis(stats.p95),
                    p99_ms: millis(stats.p99),
                },
            },
            errors: stats.error_categories.clone(),
        }
    }
}

/// Write a JSON report file to the `.tapa/reports/` directory under `base_dir`.
///
/// Creates the reports directory if it does not exist. The filename is
/// timestamped: `loadtest-YYYY-MM-DDTHH-MM-SS.json` (hyphens, not colons,
/// for Windows compatibility).
///
/// Returns the path to the written report file.
pub fn write_report(report: &LoadTestReport, base_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let reports_dir = base_dir.join(".tapa").join("reports");
    std::fs::create_dir_all(&reports_dir)?;

    let report_path = reports_dir.join(report_filename(&chrono::Utc::now()));
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(&report_path, json)?;

    Ok(report_path)
}

/// Report filename for a given timestamp.
pub fn report_filename(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    format!("loadtest-{}.json", timestamp.format("%Y-%m-%dT%H-%M-%S"))
}

//! k6-style terminal summary for a finished batch.
//!
//! [`render_summary`] is a pure function: it takes the computed
//! [`LatencyStats`] plus the session shape and returns a formatted
//! [`String`]. Colors come from the `colored` crate and honour the global
//! override set by `colored::control::set_override(false)` for `--no-color`
//! or piped output.

use colored::Colorize;

use crate::loadtest::metrics::{format_millis, LatencyStats};
use crate::loadtest::pacer::DelayRange;

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 32;

/// Batch shape shown in the summary header.
#[derive(Debug, Clone)]
pub struct SummaryContext<'a> {
    pub name: &'a str,
    pub users: u32,
    pub requests_per_user: u32,
    pub delay: DelayRange,
}

/// Render a terminal summary.
///
/// # Layout
///
/// ```text
///   tapa  GET http://localhost:8080/health
///   users: 10  requests/user: 50  delay: 100.0ms..500.0ms
///
///   http_req_duration...............: p50=12.1ms  p90=20.4ms  p95=24.0ms  p99=40.2ms
///   http_req_duration_range.........: min=3.2ms  mean=13.0ms  max=88.9ms
///   http_req_success................: 495
///   http_req_failed.................: 5
///   http_req_error_rate.............: 1.0%
///   http_req_throughput.............: 310.2 req/s
///   http_req_total..................: 500/500
///   elapsed.........................: 1.6s
///
///   errors:
///     validation....................: 4
///     timeout.......................: 1
/// ```
pub fn render_summary(stats: &LatencyStats, context: &SummaryContext<'_>) -> String {
    let mut lines = vec![render_header(context)];

    let latency = format!(
        "p50={}  p90={}  p95={}  p99={}",
        format_millis(stats.p50),
        format_millis(stats.p90),
        format_millis(stats.p95),
        format_millis(stats.p99),
    );
    let latency = if stats.p99.as_millis() < 1000 {
        latency.green().to_string()
    } else {
        latency.yellow().to_string()
    };
    lines.push(format_metric_row("http_req_duration", &latency, PAD_WIDTH));

    lines.push(format_metric_row(
        "http_req_duration_range",
        &format!(
            "min={}  mean={}  max={}",
            format_millis(stats.min),
            format_millis(stats.mean),
            format_millis(stats.max),
        ),
        PAD_WIDTH,
    ));

    lines.push(format_metric_row(
        "http_req_success",
        &stats.success_count.to_string().green().to_string(),
        PAD_WIDTH,
    ));

    let failed = if stats.error_count > 0 {
        stats.error_count.to_string().red().to_string()
    } else {
        stats.error_count.to_string()
    };
    lines.push(format_metric_row("http_req_failed", &failed, PAD_WIDTH));

    let error_rate_pct = stats.error_rate * 100.0;
    let error_rate = format!("{error_rate_pct:.1}%");
    let error_rate = if error_rate_pct > 5.0 {
        error_rate.red().to_string()
    } else if error_rate_pct > 1.0 {
        error_rate.yellow().to_string()
    } else {
        error_rate.green().to_string()
    };
    lines.push(format_metric_row("http_req_error_rate", &error_rate, PAD_WIDTH));

    lines.push(format_metric_row(
        "http_req_throughput",
        &format!("{:.1} req/s", stats.throughput_rps).green().to_string(),
        PAD_WIDTH,
    ));

    let mut total = format!("{}/{}", stats.total_requests, stats.batch_size);
    if stats.cancelled {
        total = format!("{total} {}", "(cancelled)".yellow());
    }
    lines.push(format_metric_row("http_req_total", &total, PAD_WIDTH));

    lines.push(format_metric_row(
        "elapsed",
        &format!("{:.1}s", stats.elapsed.as_secs_f64()),
        PAD_WIDTH,
    ));

    if !stats.error_categories.is_empty() {
        lines.push(String::new());
        lines.push("  errors:".to_string());
        let mut categories: Vec<_> = stats.error_categories.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in categories {
            lines.push(format_metric_row(
                &format!("  {category}"),
                &count.to_string().red().to_string(),
                PAD_WIDTH,
            ));
        }
    }

    lines.join("\n")
}

fn render_header(context: &SummaryContext<'_>) -> String {
    let delay = if context.delay.is_fixed() {
        format_millis(context.delay.min())
    } else {
        format!(
            "{}..{}",
            format_millis(context.delay.min()),
            format_millis(context.delay.max())
        )
    };
    format!(
        "\n  {}  {}\n  users: {}  requests/user: {}  delay: {}\n",
        "tapa".bold(),
        context.name,
        context.users,
        context.requests_per_user,
        delay,
    )
}

/// Produces `"  metric_name..........: value"`.
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}

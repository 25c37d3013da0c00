//! HdrHistogram-based latency statistics over an [`AggregateReport`].
//!
//! The engine itself only collects raw latencies and errors; [`LatencyStats`]
//! turns them into the percentiles, rates, and error breakdown shown in the
//! terminal summary and written to the JSON report.
//!
//! Latencies are recorded at microsecond resolution with 3 significant
//! figures. Min, max, and mean are exact; percentiles are read from the
//! histogram.

use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::loadtest::collector::AggregateReport;

/// Summary statistics for one completed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyStats {
    /// Jobs in the batch (`users × requests_per_user`).
    pub batch_size: u64,
    /// Outcomes recorded.
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Errors as a fraction of recorded outcomes (0.0..=1.0).
    pub error_rate: f64,
    /// Recorded outcomes per second of wall-clock time.
    pub throughput_rps: f64,
    pub elapsed: Duration,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
    /// Error counts keyed by category (`"timeout"`, `"validation"`, ...).
    pub error_categories: BTreeMap<String, u64>,
    /// Whether the batch was cancelled before completion.
    pub cancelled: bool,
}

impl LatencyStats {
    /// Computes statistics for a report.
    pub fn from_report(report: &AggregateReport) -> Self {
        let latencies = report.latencies();
        let histogram = latency_histogram(latencies);

        let success_count = latencies.len() as u64;
        let error_count = report.error_count() as u64;
        let total_requests = success_count + error_count;

        let error_rate = if total_requests > 0 {
            error_count as f64 / total_requests as f64
        } else {
            0.0
        };

        let elapsed_secs = report.elapsed().as_secs_f64();
        let throughput_rps = if elapsed_secs > 0.0 {
            total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        let mean = if latencies.is_empty() {
            Duration::ZERO
        } else {
            let total_nanos: u128 = latencies.iter().map(Duration::as_nanos).sum();
            let mean_nanos = total_nanos / latencies.len() as u128;
            Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX))
        };

        let percentile = |q: f64| {
            if histogram.is_empty() {
                Duration::ZERO
            } else {
                Duration::from_micros(histogram.value_at_quantile(q))
            }
        };

        Self {
            batch_size: report.batch_size() as u64,
            total_requests,
            success_count,
            error_count,
            error_rate,
            throughput_rps,
            elapsed: report.elapsed(),
            min: latencies.iter().min().copied().unwrap_or_default(),
            max: latencies.iter().max().copied().unwrap_or_default(),
            mean,
            p50: percentile(0.50),
            p90: percentile(0.90),
            p95: percentile(0.95),
            p99: percentile(0.99),
            error_categories: report
                .error_categories()
                .into_iter()
                .map(|(category, count)| (category.to_string(), count))
                .collect(),
            cancelled: report.is_cancelled(),
        }
    }
}

/// Builds a microsecond histogram from a latency sequence.
fn latency_histogram(latencies: &[Duration]) -> Histogram<u64> {
    let mut histogram = Histogram::<u64>::new(3).expect("3 sigfigs is always valid");
    for latency in latencies {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let _ = histogram.record(micros);
    }
    histogram
}

/// Formats a duration as milliseconds with one decimal place.
pub fn format_millis(d: Duration) -> String {
    format!("{:.1}ms", d.as_secs_f64() * 1000.0)
}

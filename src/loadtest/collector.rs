//! Outcome classification and the aggregate report.
//!
//! Workers emit one [`Outcome`] per job over the outcome channel. The
//! session's drain loop feeds them into a [`ResultCollector`], which splits
//! them into the latency and error sequences of the final
//! [`AggregateReport`]. Both sequences are in completion order.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::loadtest::error::RequestError;

/// Result of executing one job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The response passed every expectation; carries the measured latency.
    Success(Duration),
    /// Transport or validation failure.
    Failure(RequestError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Accumulates outcomes during the drain phase.
#[derive(Debug, Default)]
pub struct ResultCollector {
    latencies: Vec<Duration>,
    errors: Vec<RequestError>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocates for an expected number of outcomes.
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            latencies: Vec::with_capacity(expected),
            errors: Vec::new(),
        }
    }

    /// Classifies one outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(latency) => self.latencies.push(latency),
            Outcome::Failure(err) => self.errors.push(err),
        }
    }

    /// Number of outcomes recorded so far.
    pub fn len(&self) -> usize {
        self.latencies.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the collected outcomes into a report.
    pub fn into_report(self, summary: BatchSummary) -> AggregateReport {
        AggregateReport {
            name: summary.name,
            batch_size: summary.batch_size,
            latencies: self.latencies,
            errors: self.errors,
            elapsed: summary.elapsed,
            cancelled: summary.cancelled,
        }
    }
}

/// Batch-level facts attached to a report when the drain completes.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub name: String,
    pub batch_size: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Final, read-only result of one batch.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    name: String,
    batch_size: usize,
    latencies: Vec<Duration>,
    errors: Vec<RequestError>,
    elapsed: Duration,
    cancelled: bool,
}

impl AggregateReport {
    /// Display name of the session that produced this report.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latencies of successful requests, in completion order.
    pub fn latencies(&self) -> &[Duration] {
        &self.latencies
    }

    /// Failures (transport and validation), in completion order.
    pub fn errors(&self) -> &[RequestError] {
        &self.errors
    }

    /// Number of jobs the batch was built with (`users × requests_per_user`).
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Wall-clock time from the first enqueue to the last drained outcome.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns `true` if the run was cancelled before every job completed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn success_count(&self) -> usize {
        self.latencies.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Outcomes recorded: successes plus failures.
    pub fn total(&self) -> usize {
        self.latencies.len() + self.errors.len()
    }

    /// Returns `true` if one outcome was recorded for every job.
    pub fn is_complete(&self) -> bool {
        self.total() == self.batch_size
    }

    /// Error counts by category, sorted by category name.
    pub fn error_categories(&self) -> BTreeMap<&'static str, u64> {
        let mut categories = BTreeMap::new();
        for err in &self.errors {
            *categories.entry(err.error_category()).or_insert(0) += 1;
        }
        categories
    }
}

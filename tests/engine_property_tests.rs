//! Property-based tests for batch and statistics invariants.
//!
//! These tests use proptest to verify that core invariants hold across a
//! wide range of random batch shapes, delay ranges, and outcome mixes.

use async_trait::async_trait;
use http::StatusCode;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tapa::loadtest::collector::{BatchSummary, Outcome, ResultCollector};
use tapa::loadtest::error::TransportError;
use tapa::loadtest::metrics::LatencyStats;
use tapa::loadtest::pacer::{DelayRange, Pacer};
use tapa::loadtest::request::{HttpResponse, RequestTemplate};
use tapa::loadtest::session::Session;
use tapa::loadtest::transport::Transport;

/// Fails every `fail_every`-th call (never when zero).
struct Patterned {
    fail_every: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for Patterned {
    async fn send(&self, _request: RequestTemplate) -> Result<HttpResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            Err(TransportError::Timeout)
        } else {
            Ok(HttpResponse::new(StatusCode::OK))
        }
    }
}

fn run_batch(users: u32, requests_per_user: u32, fail_every: usize) -> (usize, usize, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let transport = Arc::new(Patterned {
        fail_every,
        calls: AtomicUsize::new(0),
    });
    let report = runtime.block_on(
        Session::new(RequestTemplate::get("http://x/y").unwrap(), transport.clone())
            .with_users(users)
            .with_requests_per_user(requests_per_user)
            .run(),
    );
    (
        report.success_count(),
        report.error_count(),
        transport.calls.load(Ordering::SeqCst),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Successes plus errors always equal users × requests_per_user, and the
    /// transport is called once per job.
    #[test]
    fn outcomes_match_batch_size(
        users in 0u32..8,
        requests_per_user in 0u32..12,
        fail_every in 0usize..5,
    ) {
        let (ok, failed, calls) = run_batch(users, requests_per_user, fail_every);
        let batch = (users * requests_per_user) as usize;
        prop_assert_eq!(ok + failed, batch);
        prop_assert_eq!(calls, batch);
    }

    /// Delays always fall in [min, max), whichever order the bounds came in.
    #[test]
    fn delays_within_normalized_range(
        a in 0u64..1_000_000,
        b in 0u64..1_000_000,
        seed in any::<u64>(),
    ) {
        let range = DelayRange::new(Duration::from_micros(a), Duration::from_micros(b));
        prop_assert!(range.min() <= range.max());

        let mut pacer = Pacer::seeded(range, seed);
        for _ in 0..32 {
            let d = pacer.next_delay();
            if range.is_fixed() {
                prop_assert_eq!(d, range.min());
            } else {
                prop_assert!(d >= range.min());
                prop_assert!(d < range.max());
            }
        }
    }

    /// Same seed, same delay sequence.
    #[test]
    fn seeded_pacers_are_reproducible(seed in any::<u64>()) {
        let range = DelayRange::new(Duration::ZERO, Duration::from_millis(500));
        let mut first = Pacer::seeded(range, seed);
        let mut second = Pacer::seeded(range, seed);
        for _ in 0..16 {
            prop_assert_eq!(first.next_delay(), second.next_delay());
        }
    }

    /// Percentiles are monotonic and bracketed by min and max.
    #[test]
    fn percentiles_monotonic(
        latencies in prop::collection::vec(1u64..10_000_000, 1..200),
    ) {
        let mut collector = ResultCollector::new();
        for us in &latencies {
            collector.record(Outcome::Success(Duration::from_micros(*us)));
        }
        let report = collector.into_report(BatchSummary {
            name: "GET http://x/y".to_string(),
            batch_size: latencies.len(),
            elapsed: Duration::from_secs(1),
            cancelled: false,
        });
        let stats = LatencyStats::from_report(&report);

        prop_assert!(stats.p50 <= stats.p90);
        prop_assert!(stats.p90 <= stats.p95);
        prop_assert!(stats.p95 <= stats.p99);
        prop_assert!(stats.min <= stats.mean);
        prop_assert!(stats.mean <= stats.max);
        // Histogram buckets round up by at most 0.1%
        let ceiling = stats.max + stats.max / 1000 + Duration::from_micros(1);
        prop_assert!(stats.p99 <= ceiling);
        let floor = stats.min - stats.min / 1000;
        prop_assert!(stats.p50 >= floor);
        prop_assert!(stats.p99 >= floor);
    }

    /// Error rate is always between 0.0 and 1.0 inclusive.
    #[test]
    fn error_rate_bounded(successes in 0usize..100, errors in 0usize..100) {
        let mut collector = ResultCollector::new();
        for _ in 0..successes {
            collector.record(Outcome::Success(Duration::from_millis(5)));
        }
        for _ in 0..errors {
            collector.record(Outcome::Failure(TransportError::Timeout.into()));
        }
        let report = collector.into_report(BatchSummary {
            name: "GET http://x/y".to_string(),
            batch_size: successes + errors,
            elapsed: Duration::from_secs(1),
            cancelled: false,
        });
        let stats = LatencyStats::from_report(&report);
        prop_assert!(stats.error_rate >= 0.0);
        prop_assert!(stats.error_rate <= 1.0);
        prop_assert_eq!(stats.total_requests, (successes + errors) as u64);
    }
}

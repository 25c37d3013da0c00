//! Virtual user (worker) task loop.
//!
//! Each worker pulls jobs from the shared [`JobQueue`] until it is closed and
//! drained, waits its pacing delay, sends the request, times it, validates
//! the response, and emits exactly one [`Outcome`] per job through the
//! outcome channel. A failed job never stops the worker.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::loadtest::collector::Outcome;
use crate::loadtest::error::RequestError;
use crate::loadtest::expectation::Expectation;
use crate::loadtest::pacer::Pacer;
use crate::loadtest::progress::ProgressSink;
use crate::loadtest::request::{HttpResponse, RequestTemplate};
use crate::loadtest::timer::Stopwatch;
use crate::loadtest::transport::Transport;

/// Multi-consumer job queue: one bounded mpsc receiver shared by all workers.
///
/// Whoever holds the lock receives the next job, so each job is delivered to
/// exactly one worker. Once the sender is dropped and the buffer is empty,
/// every worker observes `None` and exits.
pub type JobQueue = Arc<Mutex<mpsc::Receiver<RequestTemplate>>>;

/// Wraps a receiver into a [`JobQueue`].
pub fn job_queue(rx: mpsc::Receiver<RequestTemplate>) -> JobQueue {
    Arc::new(Mutex::new(rx))
}

/// State shared read-only by every worker of a batch.
pub struct WorkerShared {
    pub transport: Arc<dyn Transport>,
    pub expectations: Vec<Arc<dyn Expectation>>,
    pub progress: Arc<dyn ProgressSink>,
}

/// Runs every expectation in registration order, stopping at the first failure.
pub fn validate(
    expectations: &[Arc<dyn Expectation>],
    response: &HttpResponse,
) -> Result<(), RequestError> {
    for expectation in expectations {
        expectation
            .validate(response)
            .map_err(|source| RequestError::Validation {
                expectation: expectation.name(),
                source,
            })?;
    }
    Ok(())
}

/// Sends one job and classifies the result.
///
/// The stopwatch brackets only the transport call: it starts immediately
/// before `send` and stops as soon as `send` returns, success or error.
pub async fn execute_job(
    transport: &dyn Transport,
    expectations: &[Arc<dyn Expectation>],
    job: RequestTemplate,
) -> Outcome {
    let mut stopwatch = Stopwatch::start_new();
    let result = transport.send(job).await;
    let elapsed = stopwatch.stop();

    let response = match result {
        Ok(response) => response,
        Err(err) => return Outcome::Failure(err.into()),
    };

    match validate(expectations, &response) {
        Ok(()) => Outcome::Success(elapsed),
        Err(err) => Outcome::Failure(err),
    }
}

/// Dequeues the next job, or `None` once the queue is closed and drained
/// or the run is cancelled.
async fn next_job(jobs: &JobQueue, cancel: &CancellationToken) -> Option<RequestTemplate> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => None,
        job = async { jobs.lock().await.recv().await } => job,
    }
}

/// Main worker loop.
///
/// Returns the number of jobs this worker completed. Exits when the queue is
/// exhausted, when the run is cancelled, or when the outcome receiver has been
/// dropped.
pub async fn worker_loop(
    worker_id: u32,
    jobs: JobQueue,
    outcome_tx: mpsc::Sender<Outcome>,
    shared: Arc<WorkerShared>,
    mut pacer: Pacer,
    cancel: CancellationToken,
) -> u64 {
    tracing::debug!(worker_id, "worker started");
    let mut completed: u64 = 0;

    while let Some(job) = next_job(&jobs, &cancel).await {
        let delay = pacer.next_delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!(worker_id, "cancelled during pacing delay");
                    break;
                }
            }
        }

        let outcome = execute_job(shared.transport.as_ref(), &shared.expectations, job).await;
        if let Outcome::Failure(ref err) = outcome {
            tracing::trace!(worker_id, error = %err, "job failed");
        }
        completed += 1;
        shared.progress.increment();

        if outcome_tx.send(outcome).await.is_err() {
            // Receiver dropped -- the session is gone
            tracing::debug!(worker_id, "outcome receiver closed");
            break;
        }
    }

    tracing::debug!(worker_id, completed, "worker finished");
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::error::{ExpectationError, TransportError};
    use crate::loadtest::expectation::StatusIs;
    use crate::loadtest::pacer::DelayRange;
    use crate::loadtest::progress::NoProgress;
    use async_trait::async_trait;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedStatus(StatusCode);

    #[async_trait]
    impl Transport for FixedStatus {
        async fn send(&self, _request: RequestTemplate) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(self.0))
        }
    }

    struct Refused;

    #[async_trait]
    impl Transport for Refused {
        async fn send(&self, _request: RequestTemplate) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connection {
                message: "connection refused".to_string(),
            })
        }
    }

    fn job() -> RequestTemplate {
        RequestTemplate::get("http://x/y").unwrap()
    }

    #[tokio::test]
    async fn test_execute_job_success_records_latency() {
        let outcome = execute_job(&FixedStatus(StatusCode::OK), &[], job()).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_execute_job_transport_error() {
        let outcome = execute_job(&Refused, &[], job()).await;
        match outcome {
            Outcome::Failure(RequestError::Transport(TransportError::Connection { .. })) => {},
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_job_validation_error() {
        let expectations: Vec<Arc<dyn Expectation>> = vec![Arc::new(StatusIs::new(200))];
        let outcome = execute_job(
            &FixedStatus(StatusCode::INTERNAL_SERVER_ERROR),
            &expectations,
            job(),
        )
        .await;
        match outcome {
            Outcome::Failure(RequestError::Validation { expectation, .. }) => {
                assert_eq!(expectation, "status == 200");
            },
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_validate_stops_at_first_failure() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = second_calls.clone();
        let expectations: Vec<Arc<dyn Expectation>> = vec![
            Arc::new(|_: &HttpResponse| -> Result<(), ExpectationError> {
                Err(ExpectationError::new("first"))
            }),
            Arc::new(move |_: &HttpResponse| -> Result<(), ExpectationError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ExpectationError::new("second"))
            }),
        ];
        let err = validate(&expectations, &HttpResponse::new(StatusCode::OK)).unwrap_err();
        match err {
            RequestError::Validation { source, .. } => assert_eq!(source.message(), "first"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_loop_drains_closed_queue() {
        let (job_tx, job_rx) = mpsc::channel(4);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(4);
        for _ in 0..4 {
            job_tx.send(job()).await.unwrap();
        }
        drop(job_tx);

        let shared = Arc::new(WorkerShared {
            transport: Arc::new(FixedStatus(StatusCode::OK)),
            expectations: Vec::new(),
            progress: Arc::new(NoProgress),
        });
        let completed = worker_loop(
            0,
            job_queue(job_rx),
            outcome_tx,
            shared,
            Pacer::new(DelayRange::none()),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(completed, 4);
        let mut received = 0;
        while outcome_rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_loop_stops_on_cancel_during_delay() {
        let (job_tx, job_rx) = mpsc::channel(2);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(2);
        job_tx.send(job()).await.unwrap();
        job_tx.send(job()).await.unwrap();

        let cancel = CancellationToken::new();
        let shared = Arc::new(WorkerShared {
            transport: Arc::new(FixedStatus(StatusCode::OK)),
            expectations: Vec::new(),
            progress: Arc::new(NoProgress),
        });
        let handle = tokio::spawn(worker_loop(
            0,
            job_queue(job_rx),
            outcome_tx,
            shared,
            Pacer::new(DelayRange::fixed(Duration::from_secs(60))),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let completed = handle.await.unwrap();

        assert_eq!(completed, 0);
        assert!(outcome_rx.recv().await.is_none());
        drop(job_tx);
    }
}

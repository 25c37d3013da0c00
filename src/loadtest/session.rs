//! Batch orchestrator.
//!
//! [`Session`] owns the batch configuration and drives one run:
//! - Computes the batch size (`users × requests_per_user`)
//! - Enqueues that many clones of the request template on the job queue,
//!   then closes it
//! - Spawns exactly `users` workers via [`tokio_util::task::TaskTracker`]
//! - Drains one outcome per job into a [`ResultCollector`]
//! - Signals the progress sink at start, per job, and at the end

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::loadtest::collector::{AggregateReport, BatchSummary, ResultCollector};
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::expectation::Expectation;
use crate::loadtest::pacer::{DelayRange, Pacer};
use crate::loadtest::progress::{NoProgress, ProgressSink};
use crate::loadtest::request::RequestTemplate;
use crate::loadtest::transport::Transport;
use crate::loadtest::worker::{job_queue, worker_loop, WorkerShared};

/// Upper bound on the outcome channel buffer.
const MAX_OUTCOME_BUFFER: usize = 1 << 16;

/// One load test batch: a request template replayed by concurrent virtual users.
///
/// Configuration is fixed once [`Session::run`] starts; the builder methods
/// consume the session, so nothing can be registered mid-run.
pub struct Session {
    template: RequestTemplate,
    transport: Arc<dyn Transport>,
    expectations: Vec<Arc<dyn Expectation>>,
    users: u32,
    requests_per_user: u32,
    delay: DelayRange,
    name: OnceLock<String>,
    progress: Arc<dyn ProgressSink>,
    pacer_seed: Option<u64>,
}

impl Session {
    /// Creates a session with one user, one request, no delay, and no expectations.
    pub fn new(template: RequestTemplate, transport: Arc<dyn Transport>) -> Self {
        Self {
            template,
            transport,
            expectations: Vec::new(),
            users: 1,
            requests_per_user: 1,
            delay: DelayRange::none(),
            name: OnceLock::new(),
            progress: Arc::new(NoProgress),
            pacer_seed: None,
        }
    }

    /// Builds a session from a validated config file.
    pub fn from_config(
        config: &LoadTestConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, LoadTestError> {
        let mut session = Self::new(config.request_template()?, transport)
            .with_users(config.settings.users)
            .with_requests_per_user(config.settings.requests_per_user)
            .with_delay_range(config.delay_range());
        for expectation in config.expectations()? {
            session = session.with_shared_expectation(expectation);
        }
        if let Some(name) = &config.settings.name {
            session = session.with_name(name.clone());
        }
        Ok(session)
    }

    /// Sets an explicit display name, replacing any derived one.
    ///
    /// An empty name counts as unset and falls back to `"<METHOD> <URL>"`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() {
            OnceLock::new()
        } else {
            OnceLock::from(name)
        };
        self
    }

    pub fn with_users(mut self, users: u32) -> Self {
        self.users = users;
        self
    }

    pub fn with_requests_per_user(mut self, requests: u32) -> Self {
        self.requests_per_user = requests;
        self
    }

    /// Sets the per-request think time range. Reversed bounds are swapped.
    pub fn with_delay(self, min: Duration, max: Duration) -> Self {
        self.with_delay_range(DelayRange::new(min, max))
    }

    pub fn with_delay_range(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    /// Registers an expectation. Expectations run in registration order.
    pub fn with_expectation<E: Expectation + 'static>(self, expectation: E) -> Self {
        self.with_shared_expectation(Arc::new(expectation))
    }

    pub fn with_shared_expectation(mut self, expectation: Arc<dyn Expectation>) -> Self {
        self.expectations.push(expectation);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Seeds the pacing generators for reproducible delay sequences.
    pub fn with_pacer_seed(mut self, seed: u64) -> Self {
        self.pacer_seed = Some(seed);
        self
    }

    /// Display name: the explicit name if set, otherwise `"<METHOD> <URL>"`.
    ///
    /// The derived name is computed on first call and cached.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| self.template.display_name())
    }

    pub fn users(&self) -> u32 {
        self.users
    }

    pub fn requests_per_user(&self) -> u32 {
        self.requests_per_user
    }

    pub fn delay(&self) -> DelayRange {
        self.delay
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn expectation_count(&self) -> usize {
        self.expectations.len()
    }

    /// Number of jobs in one batch.
    pub fn batch_size(&self) -> usize {
        self.users as usize * self.requests_per_user as usize
    }

    /// Runs the batch to completion.
    ///
    /// The returned report holds exactly [`Session::batch_size`] outcomes.
    ///
    /// # Panics
    ///
    /// Resumes the panic of any worker whose transport or expectation panicked.
    pub async fn run(&self) -> AggregateReport {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Runs the batch until it completes or `cancel` fires.
    ///
    /// On cancellation workers stop taking jobs, pacing sleeps are abandoned,
    /// and requests already in flight are still recorded. The report is then
    /// marked cancelled and may hold fewer outcomes than the batch size.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> AggregateReport {
        let batch_size = self.batch_size();
        let name = self.name().to_string();
        let started = Instant::now();

        self.progress.start(batch_size as u64);

        if batch_size == 0 {
            tracing::info!(session = %name, "empty batch, nothing to run");
            self.progress.finish();
            return ResultCollector::new().into_report(BatchSummary {
                name,
                batch_size,
                elapsed: started.elapsed(),
                cancelled: false,
            });
        }

        tracing::info!(
            session = %name,
            users = self.users,
            requests_per_user = self.requests_per_user,
            batch_size,
            "starting batch"
        );

        let tracker = TaskTracker::new();
        let (job_tx, job_rx) = mpsc::channel::<RequestTemplate>(self.users as usize);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(batch_size.min(MAX_OUTCOME_BUFFER));
        let jobs = job_queue(job_rx);

        let producer = tracker.spawn(enqueue_batch(
            self.template.clone(),
            batch_size,
            job_tx,
            cancel.clone(),
        ));

        let shared = Arc::new(WorkerShared {
            transport: self.transport.clone(),
            expectations: self.expectations.clone(),
            progress: self.progress.clone(),
        });
        let mut master_pacer = match self.pacer_seed {
            Some(seed) => Pacer::seeded(self.delay, seed),
            None => Pacer::new(self.delay),
        };

        let workers: Vec<JoinHandle<u64>> = (0..self.users)
            .map(|worker_id| {
                tracker.spawn(worker_loop(
                    worker_id,
                    jobs.clone(),
                    outcome_tx.clone(),
                    shared.clone(),
                    master_pacer.fork(),
                    cancel.clone(),
                ))
            })
            .collect();
        tracker.close();

        // Workers hold their own clones
        drop(jobs);
        drop(outcome_tx);

        let mut collector = ResultCollector::with_capacity(batch_size.min(MAX_OUTCOME_BUFFER));
        while collector.len() < batch_size {
            match outcome_rx.recv().await {
                Some(outcome) => collector.record(outcome),
                // Every worker has exited
                None => break,
            }
        }
        let elapsed = started.elapsed();
        self.progress.finish();

        join_task(producer).await;
        for worker in workers {
            join_task(worker).await;
        }
        tracker.wait().await;

        let received = collector.len();
        let cancelled = cancel.is_cancelled() && received < batch_size;
        if !cancelled && received != batch_size {
            panic!("batch drained {received} outcomes, expected {batch_size}");
        }

        tracing::info!(
            session = %name,
            received,
            batch_size,
            cancelled,
            elapsed_ms = elapsed.as_millis() as u64,
            "batch finished"
        );

        collector.into_report(BatchSummary {
            name,
            batch_size,
            elapsed,
            cancelled,
        })
    }
}

/// Enqueues `batch_size` clones of `template`, then closes the queue by
/// dropping the sender. Returns the number of jobs enqueued.
async fn enqueue_batch(
    template: RequestTemplate,
    batch_size: usize,
    job_tx: mpsc::Sender<RequestTemplate>,
    cancel: CancellationToken,
) -> usize {
    let mut enqueued = 0;
    while enqueued < batch_size {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            sent = job_tx.send(template.clone()) => {
                if sent.is_err() {
                    // All workers are gone
                    break;
                }
            }
        }
        enqueued += 1;
    }
    tracing::debug!(enqueued, "job queue closed");
    enqueued
}

/// Awaits a batch task, resuming its panic on the caller.
async fn join_task<T>(handle: JoinHandle<T>) -> Option<T> {
    match handle.await {
        Ok(value) => Some(value),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => {
            tracing::warn!(error = %err, "batch task did not complete");
            None
        },
    }
}

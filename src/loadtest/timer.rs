//! Wall-clock stopwatch for timing a single request.

use std::time::{Duration, Instant};

/// Measures the elapsed time of one operation.
///
/// `duration()` reads the running time while started and the frozen time
/// once stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and immediately starts a stopwatch.
    pub fn start_new() -> Self {
        let mut sw = Self::new();
        sw.start();
        sw
    }

    /// Starts (or restarts) timing from now.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.elapsed = Duration::ZERO;
    }

    /// Stops timing and freezes the elapsed duration. No-op if not running.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.elapsed = started.elapsed();
        }
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn duration(&self) -> Duration {
        match self.started {
            Some(started) => started.elapsed(),
            None => self.elapsed,
        }
    }
}

//! Per-request think time for virtual users.
//!
//! A [`Pacer`] draws the delay a worker waits before each request. Every
//! worker owns its own pacer (see [`Pacer::fork`]), so the random source is
//! never shared between tasks and needs no locking.

use std::time::Duration;

use rand::prelude::*;
use rand::rngs::StdRng;

/// Normalized `[min, max]` delay range.
///
/// Construction swaps reversed bounds instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Creates a range, exchanging the bounds if `min > max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// A range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns `true` if every draw yields the same delay.
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

/// Produces the delay before each request, drawn from a [`DelayRange`].
pub struct Pacer {
    range: DelayRange,
    rng: StdRng,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl Pacer {
    /// Creates a pacer seeded from the thread-local generator.
    pub fn new(range: DelayRange) -> Self {
        Self {
            range,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Creates a deterministic pacer for reproducible delay sequences.
    pub fn seeded(range: DelayRange, seed: u64) -> Self {
        Self {
            range,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a pacer with the same range and an independently seeded generator.
    ///
    /// The session forks one pacer per worker.
    pub fn fork(&mut self) -> Self {
        Self {
            range: self.range,
            rng: StdRng::from_rng(&mut self.rng),
        }
    }

    pub fn range(&self) -> DelayRange {
        self.range
    }

    /// Delay to wait before the next request.
    ///
    /// Returns the fixed value when `min == max` (including zero), otherwise
    /// a value drawn uniformly from `[min, max)`.
    pub fn next_delay(&mut self) -> Duration {
        if self.range.is_fixed() {
            return self.range.min;
        }
        let min = duration_to_nanos(self.range.min);
        let max = duration_to_nanos(self.range.max);
        if min >= max {
            return self.range.min;
        }
        Duration::from_nanos(self.rng.random_range(min..max))
    }
}

/// Nanosecond count of `d`, saturating at `u64::MAX` (~584 years).
fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

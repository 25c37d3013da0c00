//! Fuzz target for delay generation.
//!
//! Arbitrary bounds (including reversed and near-`u64::MAX` ones) must
//! never panic and must always yield a delay inside the normalized range.
//!
//! Run with: `cargo +nightly fuzz run fuzz_pacer_range`

#![no_main]
use libfuzzer_sys::fuzz_target;
use std::time::Duration;
use tapa::loadtest::pacer::{DelayRange, Pacer};

fuzz_target!(|input: (u64, u32, u64, u32, u64)| {
    let (min_secs, min_nanos, max_secs, max_nanos, seed) = input;
    let min = Duration::new(min_secs, min_nanos % 1_000_000_000);
    let max = Duration::new(max_secs, max_nanos % 1_000_000_000);
    let range = DelayRange::new(min, max);

    let mut pacer = Pacer::seeded(range, seed);
    for _ in 0..8 {
        let d = pacer.next_delay();
        assert!(d >= range.min());
        assert!(d <= range.max());
    }
});

//! Fuzz target for TOML config parsing.
//!
//! Feeds arbitrary UTF-8 input to `LoadTestConfig::from_toml()` and, when it
//! parses, builds the request template and expectations. Errors are
//! expected; panics are not.
//!
//! Run with: `cargo +nightly fuzz run fuzz_config_parse`

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = tapa::loadtest::config::LoadTestConfig::from_toml(s) {
            let _ = config.request_template();
            let _ = config.expectations();
            let _ = config.delay_range();
            let _ = config.batch_size();
        }
    }
});

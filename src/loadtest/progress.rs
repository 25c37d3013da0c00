//! Progress side-channel for a running batch.
//!
//! The session calls [`ProgressSink::start`] once with the batch size,
//! [`ProgressSink::increment`] once per completed job (from whichever worker
//! finished it), and [`ProgressSink::finish`] after the drain. Progress is
//! informational only and has no bearing on the report.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives batch progress events.
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64);
    fn increment(&self);
    fn finish(&self);
}

/// Discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn increment(&self) {}
    fn finish(&self) {}
}

/// Terminal progress bar on stderr.
///
/// Draws nothing when stderr is not a terminal.
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Creates a hidden bar; it becomes visible on [`ProgressSink::start`].
    pub fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, eta {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.set_message(label.into());
        Self { bar }
    }
}

impl ProgressSink for ProgressBarSink {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        if std::io::stderr().is_terminal() {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
            self.bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

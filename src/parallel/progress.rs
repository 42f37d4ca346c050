use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::core::Strategy;
use crate::work::WorkResult;

/// Receives a callback for every recorded result
///
/// Called from whichever thread recorded the result, so implementations must
/// be cheap and thread safe.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _strategy: Strategy, _total: usize) {}

    fn on_result(&self, result: &WorkResult, processed: usize, total: usize);

    fn on_finish(&self) {}
}

/// Live success/failure counters shared across execution units
#[derive(Debug, Default)]
pub struct BatchStats {
    pub succeeded: AtomicUsize,
    pub failed: AtomicUsize,
}

impl BatchStats {
    pub fn counts(&self) -> (usize, usize) {
        (
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Terminal progress bar with live statistics
pub struct BatchProgress {
    bar: ProgressBar,
    stats: BatchStats,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        let style = ProgressStyle::with_template(
            "⚡ [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} items {spinner} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            stats: BatchStats::default(),
        }
    }

    /// A bar that never draws, for quiet runs and tests
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden());
        Self {
            bar,
            stats: BatchStats::default(),
        }
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }
}

impl ProgressObserver for BatchProgress {
    fn on_start(&self, strategy: Strategy, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_prefix(strategy.name());
    }

    fn on_result(&self, result: &WorkResult, processed: usize, _total: usize) {
        if result.is_success() {
            self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        let (succeeded, failed) = self.stats.counts();
        self.bar.set_position(processed as u64);
        self.bar.set_message(format!("✔ {succeeded} | ✖ {failed}"));
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::summary::BatchSummary;
use crate::work::WorkResult;

/// Append-only result log for one batch
///
/// Append order is completion order. Safe to share between cooperative
/// tasks, worker threads and the threads that talk to worker processes.
/// There is no way to remove or reset; a new batch gets a new aggregator.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    log: Mutex<Vec<WorkResult>>,
    processed: AtomicUsize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            log: Mutex::new(Vec::with_capacity(capacity)),
            processed: AtomicUsize::new(0),
        }
    }

    /// Append a result and return how many results have been recorded so far
    pub fn record(&self, result: WorkResult) -> usize {
        self.record_with(result, |_, _| {})
    }

    /// Append a result, then hand the stored copy and the new count to `inspect`
    ///
    /// `inspect` runs while the log is locked; keep it short.
    pub fn record_with(&self, result: WorkResult, inspect: impl FnOnce(&WorkResult, usize)) -> usize {
        let mut log = self.log.lock();
        log.push(result);
        let processed = self.processed.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(stored) = log.last() {
            inspect(stored, processed);
        }
        processed
    }

    /// Number of results recorded, readable without taking the log lock
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_results(self.log.lock().iter())
    }

    /// Last `count` results, most recently completed first
    pub fn recent(&self, count: usize) -> Vec<WorkResult> {
        self.log.lock().iter().rev().take(count).cloned().collect()
    }

    /// Copy of the whole log in append order
    pub fn snapshot(&self) -> Vec<WorkResult> {
        self.log.lock().clone()
    }
}

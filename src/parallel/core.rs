use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::admission::AdmissionController;
use super::harness::ItemSettings;
use super::hybrid::PartitionRule;
use super::progress::ProgressObserver;
use super::{cooperative, hybrid, process, threaded};
use crate::error::BatchError;
use crate::results::ResultAggregator;
use crate::work::{WorkFunction, WorkItem, WorkResult};

/// The four interchangeable ways to run a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Single scheduling thread, units suspend only at I/O
    Cooperative,
    /// Fixed pool of OS threads
    Threads,
    /// Cooperative and thread pool side by side, split by a partition rule
    Hybrid,
    /// Fixed pool of worker processes, results in submission order
    Processes,
}

/// Order in which a strategy appends results to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrdering {
    /// Whatever order items happen to finish in
    Completion,
    /// Same order the items were submitted in
    Submission,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Cooperative,
        Strategy::Threads,
        Strategy::Hybrid,
        Strategy::Processes,
    ];

    pub fn ordering(self) -> ResultOrdering {
        match self {
            Strategy::Processes => ResultOrdering::Submission,
            _ => ResultOrdering::Completion,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Cooperative => "cooperative",
            Strategy::Threads => "threads",
            Strategy::Hybrid => "hybrid",
            Strategy::Processes => "processes",
        }
    }

    /// Run every item, recording each result into `ctx.results`
    ///
    /// Per-item failures are recorded, not returned. An `Err` means an
    /// execution unit died or the batch was cancelled.
    pub async fn run(self, items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
        match self {
            Strategy::Cooperative => cooperative::run(items, ctx).await,
            Strategy::Threads => threaded::run(items, ctx).await,
            Strategy::Hybrid => hybrid::run(items, ctx).await,
            Strategy::Processes => process::run(items, ctx).await,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Pool sizing knobs
///
/// `worker_count` and the admission cap are independent: the thread pool
/// spawns `min(worker_count, items)` threads and every item still passes
/// admission, so effective concurrency is `min(worker_count, max_concurrency)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub worker_count: usize,
    /// 0 means one process per available CPU
    pub process_count: usize,
    /// Executable started as `<program> worker`; defaults to the current executable
    pub worker_program: Option<PathBuf>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            worker_count: 8,
            process_count: 0,
            worker_program: None,
        }
    }
}

impl PoolSettings {
    pub fn thread_workers(&self, item_count: usize) -> usize {
        self.worker_count.max(1).min(item_count.max(1))
    }

    pub fn process_workers(&self, item_count: usize, max_concurrency: usize) -> usize {
        let configured = if self.process_count == 0 {
            num_cpus::get()
        } else {
            self.process_count
        };
        configured.min(max_concurrency).min(item_count).max(1)
    }

    pub fn program(&self) -> std::io::Result<PathBuf> {
        match &self.worker_program {
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe(),
        }
    }
}

/// Everything a strategy needs to run one batch
#[derive(Clone)]
pub struct ExecutionContext {
    pub function: Arc<dyn WorkFunction>,
    pub admission: AdmissionController,
    pub results: Arc<ResultAggregator>,
    pub settings: ItemSettings,
    pub pool: PoolSettings,
    pub partition: PartitionRule,
    pub cancel: CancellationToken,
    pub progress: Option<Arc<dyn ProgressObserver>>,
    /// Items submitted for the whole batch, across every strategy half
    pub total: usize,
}

impl ExecutionContext {
    /// Append a finished result to the log and report progress
    pub fn record(&self, result: WorkResult) -> usize {
        self.results.record_with(result, |stored, processed| {
            let status = if stored.is_success() { "✓" } else { "✗" };
            tracing::debug!(
                "{} [{}] {} ({} bytes) in {:.3}s - Progress: {}/{}",
                status,
                stored.executor,
                stored.identifier,
                stored.size,
                stored.elapsed,
                processed,
                self.total
            );

            if let Some(observer) = &self.progress {
                observer.on_result(stored, processed, self.total);
            }
        })
    }

    /// The error to surface when cancellation cut the batch short, if it did
    pub fn cancellation(&self) -> Option<BatchError> {
        let recorded = self.results.processed();
        (self.cancel.is_cancelled() && recorded < self.total).then_some(BatchError::Cancelled {
            recorded,
            expected: self.total,
        })
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("function", &self.function.name())
            .field("max_concurrency", &self.admission.max_concurrency())
            .field("settings", &self.settings)
            .field("pool", &self.pool)
            .field("partition", &self.partition)
            .field("total", &self.total)
            .finish()
    }
}

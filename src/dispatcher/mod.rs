//! Dispatcher facade
//!
//! Turns a [`WorkSource`] into work items, runs them under one strategy and
//! hands back a [`BatchReport`] whose summary is derived from the batch's own
//! result log.

pub mod compare;
pub mod discovery;

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::parallel::{AdmissionController, ExecutionContext, ProgressObserver, Strategy};
use crate::results::{BatchSummary, ResultAggregator};
use crate::work::{WorkFunction, WorkItem, WorkResult};

pub use compare::{Comparison, ComparisonEntry};
pub use discovery::{WorkSource, discover};

/// Outcome of one finished batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub strategy: Strategy,
    pub summary: BatchSummary,
    pub wall_seconds: f64,
    #[serde(skip)]
    results: Arc<ResultAggregator>,
}

impl BatchReport {
    fn no_work(strategy: Strategy) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            strategy,
            summary: BatchSummary::no_work(),
            wall_seconds: 0.0,
            results: Arc::new(ResultAggregator::new()),
        }
    }

    pub fn is_no_work(&self) -> bool {
        self.summary.is_no_work()
    }

    /// Last `count` results, most recently completed first
    pub fn recent(&self, count: usize) -> Vec<WorkResult> {
        self.results.recent(count)
    }

    /// The full log in append order
    pub fn results(&self) -> Vec<WorkResult> {
        self.results.snapshot()
    }

    /// Items per second of wall time
    pub fn throughput(&self) -> f64 {
        if self.wall_seconds > 0.0 {
            self.summary.total as f64 / self.wall_seconds
        } else {
            0.0
        }
    }
}

/// What a caller gets back from [`Dispatcher::run_source`]
#[derive(Debug)]
pub enum BatchOutcome {
    Completed(BatchReport),
    /// The source was valid but held nothing to do
    NoWork,
    /// The source itself was unusable; nothing ran
    InvalidInput(String),
}

/// Runs batches with one validated configuration and one work function
pub struct Dispatcher {
    config: BatchConfig,
    function: Arc<dyn WorkFunction>,
    progress: Option<Arc<dyn ProgressObserver>>,
    worker_program: Option<PathBuf>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(config: BatchConfig, function: Arc<dyn WorkFunction>) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            config,
            function,
            progress: None,
            worker_program: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Executable the process pool starts as `<program> worker`
    pub fn with_worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Cancelling this token stops the running batch and every later one
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn discover(&self, source: &WorkSource) -> Result<Vec<WorkItem>, BatchError> {
        discover(source)
    }

    /// Run every item under `strategy`
    ///
    /// An empty batch returns a no-work report without touching an
    /// aggregator. Otherwise the log must hold exactly one result per item;
    /// a shortfall is an error, never a smaller summary.
    pub async fn run_batch(&self, items: Vec<WorkItem>, strategy: Strategy) -> Result<BatchReport, BatchError> {
        if items.is_empty() {
            tracing::info!("No work items; nothing to run");
            return Ok(BatchReport::no_work(strategy));
        }

        let batch_id = Uuid::new_v4();
        let total = items.len();
        let results = Arc::new(ResultAggregator::with_capacity(total));

        let mut pool = self.config.pool_settings();
        pool.worker_program = self.worker_program.clone();

        let ctx = ExecutionContext {
            function: self.function.clone(),
            admission: AdmissionController::new(self.config.dispatch.max_concurrency),
            results: results.clone(),
            settings: self.config.item_settings(),
            pool,
            partition: self.config.partition_rule(),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
            total,
        };

        tracing::info!(
            "Batch {} starting: {} items via {} ({}, max_concurrency {})",
            batch_id,
            total,
            strategy,
            self.function.name(),
            ctx.admission.max_concurrency()
        );

        if let Some(observer) = &self.progress {
            observer.on_start(strategy, total);
        }
        let start = Instant::now();
        let outcome = strategy.run(items, &ctx).await;
        let wall_time = start.elapsed();
        if let Some(observer) = &self.progress {
            observer.on_finish();
        }

        if let Err(err) = outcome {
            tracing::warn!(
                "Batch {} failed after {:.2}s with {} of {} results: {}",
                batch_id,
                wall_time.as_secs_f64(),
                results.processed(),
                total,
                err
            );
            return Err(err);
        }

        let recorded = results.len();
        if recorded != total {
            return Err(BatchError::MissingResults {
                expected: total,
                recorded,
            });
        }

        let report = BatchReport {
            batch_id,
            strategy,
            summary: results.summary(),
            wall_seconds: round_seconds(wall_time),
            results,
        };
        tracing::info!(
            "Batch {} finished in {:.2}s: {} succeeded, {} failed (peak concurrency {})",
            batch_id,
            report.wall_seconds,
            report.summary.successful,
            report.summary.failed,
            ctx.admission.high_water_mark()
        );
        Ok(report)
    }

    /// Discover then run, folding configuration problems into the outcome
    ///
    /// Only execution-unit crashes and cancellation come back as `Err`.
    pub async fn run_source(&self, source: &WorkSource, strategy: Strategy) -> Result<BatchOutcome, BatchError> {
        let items = match self.discover(source) {
            Ok(items) => items,
            Err(BatchError::InvalidInput(reason)) => return Ok(BatchOutcome::InvalidInput(reason)),
            Err(err) => return Err(err),
        };
        if items.is_empty() {
            return Ok(BatchOutcome::NoWork);
        }
        self.run_batch(items, strategy).await.map(BatchOutcome::Completed)
    }
}

fn round_seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}

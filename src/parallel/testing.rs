//! Shared fixtures for strategy unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::admission::AdmissionController;
use super::core::{ExecutionContext, PoolSettings};
use super::harness::ItemSettings;
use super::hybrid::PartitionRule;
use crate::error::WorkError;
use crate::results::ResultAggregator;
use crate::work::{WorkFunction, WorkOutput};

/// Work function that sleeps, tracks its own concurrency and fails on demand
pub struct Instrumented {
    delay: Duration,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    costs: HashMap<String, u64>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl Instrumented {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failing: HashSet::new(),
            hanging: HashSet::new(),
            costs: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    pub fn failing<const N: usize>(mut self, identifiers: [&str; N]) -> Self {
        self.failing.extend(identifiers.iter().map(|id| id.to_string()));
        self
    }

    /// Items whose call never returns
    pub fn hanging<const N: usize>(mut self, identifiers: [&str; N]) -> Self {
        self.hanging.extend(identifiers.iter().map(|id| id.to_string()));
        self
    }

    pub fn with_costs<const N: usize>(mut self, costs: [(&str, u64); N]) -> Self {
        self.costs.extend(costs.iter().map(|(id, cost)| (id.to_string(), *cost)));
        self
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, identifier: &str) -> Result<WorkOutput, WorkError> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(identifier) {
            Err(WorkError::Other(format!("{identifier} refused")))
        } else {
            Ok(WorkOutput::new(format!("payload of {identifier}"), identifier.len() as u64))
        }
    }
}

#[async_trait]
impl WorkFunction for Instrumented {
    fn name(&self) -> &'static str {
        "instrumented"
    }

    async fn call(&self, identifier: &str) -> Result<WorkOutput, WorkError> {
        if self.hanging.contains(identifier) {
            std::future::pending::<()>().await;
        }
        self.enter();
        tokio::time::sleep(self.delay).await;
        self.leave(identifier)
    }

    fn call_blocking(&self, identifier: &str, _timeout: Duration) -> Result<WorkOutput, WorkError> {
        while self.hanging.contains(identifier) {
            std::thread::park();
        }
        self.enter();
        std::thread::sleep(self.delay);
        self.leave(identifier)
    }

    fn estimate_cost(&self, identifier: &str) -> Option<u64> {
        self.costs.get(identifier).copied()
    }
}

pub fn context(function: Arc<dyn WorkFunction>, max_concurrency: usize, total: usize) -> ExecutionContext {
    ExecutionContext {
        function,
        admission: AdmissionController::new(max_concurrency),
        results: Arc::new(ResultAggregator::with_capacity(total)),
        settings: ItemSettings::default(),
        pool: PoolSettings::default(),
        partition: PartitionRule::default(),
        cancel: CancellationToken::new(),
        progress: None,
        total,
    }
}

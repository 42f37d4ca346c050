use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::core::ExecutionContext;
use super::{cooperative, threaded};
use crate::error::BatchError;
use crate::work::{WorkFunction, WorkItem};

/// Default size split: below 10 000 bytes stays cooperative
pub const DEFAULT_SIZE_THRESHOLD: u64 = 10_000;

/// How the config names a partition rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    #[default]
    Size,
    Parity,
}

/// Decides which half of a hybrid batch an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionRule {
    /// Estimated cost at or above `threshold` goes to the thread pool;
    /// below it, or unknown, stays cooperative
    Size { threshold: u64 },
    /// Even batch indices cooperative, odd indices thread pool
    Parity,
}

impl Default for PartitionRule {
    fn default() -> Self {
        PartitionRule::Size {
            threshold: DEFAULT_SIZE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Cooperative,
    Thread,
}

impl PartitionRule {
    pub fn from_config(kind: PartitionKind, threshold: u64) -> Self {
        match kind {
            PartitionKind::Size => PartitionRule::Size { threshold },
            PartitionKind::Parity => PartitionRule::Parity,
        }
    }

    pub fn route(&self, index: usize, cost: Option<u64>) -> Route {
        match self {
            PartitionRule::Size { threshold } => match cost {
                Some(cost) if cost >= *threshold => Route::Thread,
                _ => Route::Cooperative,
            },
            PartitionRule::Parity if index % 2 == 1 => Route::Thread,
            PartitionRule::Parity => Route::Cooperative,
        }
    }

    fn needs_cost(&self) -> bool {
        matches!(self, PartitionRule::Size { .. })
    }
}

/// The two halves of a hybrid batch
#[derive(Debug, Default)]
pub struct Split {
    pub cooperative: Vec<WorkItem>,
    pub threaded: Vec<WorkItem>,
    /// Items the size rule had no cost estimate for
    pub unknown_cost: usize,
}

impl Split {
    /// True when the size rule could not route anything by size
    pub fn is_blind(&self, rule: PartitionRule) -> bool {
        let total = self.cooperative.len() + self.threaded.len();
        rule.needs_cost() && total > 0 && self.unknown_cost == total
    }
}

/// Split items into the cooperative half and the thread half
///
/// Relative order inside each half follows the input. Cost estimates (file
/// metadata lookups, for the file reader) are taken in parallel.
pub fn partition(items: Vec<WorkItem>, rule: PartitionRule, function: &dyn WorkFunction) -> Split {
    let routed: Vec<(Route, bool, WorkItem)> = if rule.needs_cost() {
        items
            .into_par_iter()
            .map(|item| {
                let cost = function.estimate_cost(&item.identifier);
                (rule.route(item.index, cost), cost.is_none(), item)
            })
            .collect()
    } else {
        items
            .into_iter()
            .map(|item| (rule.route(item.index, None), false, item))
            .collect()
    };

    let mut split = Split::default();
    for (route, unknown, item) in routed {
        split.unknown_cost += usize::from(unknown);
        match route {
            Route::Cooperative => split.cooperative.push(item),
            Route::Thread => split.threaded.push(item),
        }
    }
    split
}

/// Run the two halves at the same time under one shared admission cap
pub async fn run(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let function = ctx.function.clone();
    let rule = ctx.partition;
    let split = tokio::task::spawn_blocking(move || partition(items, rule, function.as_ref()))
        .await
        .map_err(|e| BatchError::crashed("hybrid partitioner", e))?;

    if split.is_blind(rule) {
        tracing::warn!(
            "{} gives no cost estimates, so every item stays cooperative; use the parity partition to engage the thread pool",
            ctx.function.name()
        );
    }
    tracing::info!(
        "Hybrid split ({:?}): {} cooperative, {} thread pool",
        rule,
        split.cooperative.len(),
        split.threaded.len()
    );
    let Split {
        cooperative: cooperative_items,
        threaded: thread_items,
        ..
    } = split;

    let (cooperative_outcome, thread_outcome) = tokio::join!(
        cooperative::run(cooperative_items, ctx),
        threaded::run(thread_items, ctx)
    );

    // A crash outranks a cancellation from the other half
    match (cooperative_outcome, thread_outcome) {
        (Err(crash @ BatchError::WorkerCrashed { .. }), _) | (_, Err(crash @ BatchError::WorkerCrashed { .. })) => {
            Err(crash)
        }
        (Err(err), _) | (_, Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}

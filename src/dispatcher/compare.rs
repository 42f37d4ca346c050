use serde::Serialize;

use super::Dispatcher;
use crate::error::BatchError;
use crate::parallel::Strategy;
use crate::results::BatchSummary;
use crate::work::WorkItem;

/// One strategy's run inside a comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub strategy: Strategy,
    pub wall_seconds: f64,
    pub summary: Option<BatchSummary>,
    /// Cooperative wall time divided by this one; absent without a baseline
    pub speedup: Option<f64>,
    pub error: Option<String>,
}

/// Same items under several strategies, fastest first
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub items: usize,
    pub entries: Vec<ComparisonEntry>,
}

impl Comparison {
    pub fn fastest(&self) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|entry| entry.error.is_none())
    }
}

impl Dispatcher {
    /// Run `items` once per strategy, one batch after another
    ///
    /// A strategy that fails (a crashed worker, a function that cannot
    /// cross the process boundary) is listed with its error and sorted last.
    /// Cancellation stops the whole comparison.
    pub async fn compare(&self, items: &[WorkItem], strategies: &[Strategy]) -> Result<Comparison, BatchError> {
        let mut entries = Vec::with_capacity(strategies.len());

        for &strategy in strategies {
            tracing::info!("Comparing strategy {} on {} items", strategy, items.len());
            let entry = match self.run_batch(items.to_vec(), strategy).await {
                Ok(report) => ComparisonEntry {
                    strategy,
                    wall_seconds: report.wall_seconds,
                    summary: Some(report.summary),
                    speedup: None,
                    error: None,
                },
                Err(err @ BatchError::Cancelled { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!("Strategy {} failed during comparison: {}", strategy, err);
                    ComparisonEntry {
                        strategy,
                        wall_seconds: 0.0,
                        summary: None,
                        speedup: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            entries.push(entry);
        }

        let baseline = entries
            .iter()
            .find(|entry| entry.strategy == Strategy::Cooperative && entry.error.is_none())
            .map(|entry| entry.wall_seconds);
        if let Some(baseline) = baseline {
            for entry in entries.iter_mut().filter(|entry| entry.error.is_none()) {
                entry.speedup = (entry.wall_seconds > 0.0).then(|| baseline / entry.wall_seconds);
            }
        }

        entries.sort_by(|a, b| {
            a.error
                .is_some()
                .cmp(&b.error.is_some())
                .then(a.wall_seconds.total_cmp(&b.wall_seconds))
        });

        Ok(Comparison {
            items: items.len(),
            entries,
        })
    }
}

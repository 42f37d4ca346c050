use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::work::{ExecutorTag, WorkResult};

/// Aggregate view of a result log
///
/// Always derived from the log, never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Bytes over successful results only
    pub total_bytes: u64,
    pub total_megabytes: f64,
    /// Mean elapsed seconds over every result, failures included
    pub average_elapsed: f64,
    pub extensions: BTreeSet<String>,
    pub status_codes: BTreeSet<u16>,
    pub executors: ExecutorBreakdown,
}

/// How many results each kind of execution context produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorBreakdown {
    pub cooperative: usize,
    pub thread: usize,
    pub process: usize,
}

impl BatchSummary {
    /// The summary of a batch that had nothing to do
    pub fn no_work() -> Self {
        Self::default()
    }

    pub fn is_no_work(&self) -> bool {
        self.total == 0
    }

    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a WorkResult>,
    {
        let mut summary = Self::default();
        let mut elapsed_sum = 0.0;

        for result in results {
            summary.total += 1;
            elapsed_sum += result.elapsed;

            if result.is_success() {
                summary.successful += 1;
                summary.total_bytes += result.size;
            } else {
                summary.failed += 1;
            }

            if let Some(ext) = identifier_extension(&result.identifier) {
                summary.extensions.insert(ext);
            }
            if let Some(code) = result.status_code {
                summary.status_codes.insert(code);
            }

            match result.executor {
                ExecutorTag::Cooperative { .. } => summary.executors.cooperative += 1,
                ExecutorTag::Thread { .. } => summary.executors.thread += 1,
                ExecutorTag::Process { .. } => summary.executors.process += 1,
            }
        }

        if summary.total > 0 {
            summary.average_elapsed = elapsed_sum / summary.total as f64;
        }
        summary.total_megabytes = round2(summary.total_bytes as f64 / (1024.0 * 1024.0));
        summary
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Extension of the path an identifier points at, with its leading dot
///
/// URLs use their path component, so `https://host.com/a/b` has none.
pub fn identifier_extension(identifier: &str) -> Option<String> {
    let path = if identifier.contains("://") {
        reqwest::Url::parse(identifier).ok()?.path().to_string()
    } else {
        identifier.to_string()
    };

    Path::new(&path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

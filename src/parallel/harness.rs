//! The per-item boundary
//!
//! Everything that can go wrong while one work function runs (an error, a
//! timeout, a panic) stops here and becomes a failed [`WorkResult`]. Nothing
//! unwinds past these two functions.

use crossbeam::channel::{RecvTimeoutError, bounded};
use futures::FutureExt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::WorkError;
use crate::work::{ExecutorTag, WorkFunction, WorkResult};

/// Per-item limits shared by every strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSettings {
    pub truncate_length: usize,
    pub timeout: Duration,
}

impl Default for ItemSettings {
    fn default() -> Self {
        Self {
            truncate_length: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Run one item on the cooperative scheduler
///
/// Call only after admission was granted; `elapsed` starts here.
pub async fn run_async(
    function: &dyn WorkFunction,
    identifier: &str,
    settings: ItemSettings,
    executor: ExecutorTag,
) -> WorkResult {
    let start = Instant::now();
    let call = AssertUnwindSafe(function.call(identifier)).catch_unwind();

    let outcome = match tokio::time::timeout(settings.timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(WorkError::from_panic(panic)),
        Err(_) => Err(WorkError::Timeout {
            limit: settings.timeout,
        }),
    };

    finish(identifier, outcome, start.elapsed(), executor, settings)
}

/// Run one item from an OS worker thread
///
/// Call only after admission was granted; `elapsed` starts here. The call
/// itself runs on a helper thread so the deadline holds even when the work
/// function never returns. Such a call is abandoned and reported as a
/// timeout; its helper thread exits whenever the call finally does.
pub fn run_blocking(
    function: &Arc<dyn WorkFunction>,
    identifier: &str,
    settings: ItemSettings,
    executor: ExecutorTag,
) -> WorkResult {
    let start = Instant::now();
    let (outcome_tx, outcome_rx) = bounded(1);
    let call_function = Arc::clone(function);
    let call_identifier = identifier.to_string();
    let timeout = settings.timeout;

    let spawned = std::thread::Builder::new()
        .name(format!("batchio-call-{executor}"))
        .spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                call_function.call_blocking(&call_identifier, timeout)
            }))
            .unwrap_or_else(|panic| Err(WorkError::from_panic(panic)));
            // Nobody is listening any more if the deadline already passed
            let _ = outcome_tx.send(outcome);
        });

    let outcome = match spawned {
        Err(e) => Err(WorkError::Other(format!("failed to start call thread: {e}"))),
        Ok(_) => match outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Abandoning {} after {:?}", identifier, timeout);
                Err(WorkError::Timeout { limit: timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(WorkError::Panicked(
                "call thread exited without a result".to_string(),
            )),
        },
    };

    finish(identifier, outcome, start.elapsed(), executor, settings)
}

fn finish(
    identifier: &str,
    outcome: Result<crate::work::WorkOutput, WorkError>,
    elapsed: Duration,
    executor: ExecutorTag,
    settings: ItemSettings,
) -> WorkResult {
    match outcome {
        Ok(output) => WorkResult::success(identifier, output, elapsed, executor, settings.truncate_length),
        Err(err) => {
            tracing::warn!("✗ [{}] {}: {}", executor, identifier, err);
            WorkResult::failure(identifier, &err, elapsed, executor)
        }
    }
}

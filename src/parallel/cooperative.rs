use futures::StreamExt;
use futures::stream::FuturesUnordered;

use super::core::ExecutionContext;
use super::harness;
use crate::error::BatchError;
use crate::work::{ExecutorTag, WorkItem, WorkResult};

/// Run every item as a cooperative unit on the calling task
///
/// Units are polled from a single `FuturesUnordered`, so no two of them ever
/// run at the same instant; they interleave only where a work function
/// awaits I/O. Results are recorded as units finish.
///
/// On cancellation the pending units are dropped, which drops their
/// admission permits with them.
pub async fn run(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let mut units: FuturesUnordered<_> = items.into_iter().map(|item| unit(item, ctx)).collect();

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::warn!("Cooperative run cancelled with {} units outstanding", units.len());
                return Err(ctx.cancellation().unwrap_or(BatchError::Cancelled {
                    recorded: ctx.results.processed(),
                    expected: ctx.total,
                }));
            }
            next = units.next() => match next {
                Some(result) => {
                    ctx.record(result);
                }
                None => break,
            },
        }
    }

    Ok(())
}

async fn unit(item: WorkItem, ctx: &ExecutionContext) -> WorkResult {
    let _permit = ctx.admission.acquire().await;
    harness::run_async(
        ctx.function.as_ref(),
        &item.identifier,
        ctx.settings,
        ExecutorTag::Cooperative { task: item.index },
    )
    .await
}

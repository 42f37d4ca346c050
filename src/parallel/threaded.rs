use crossbeam::channel::{Receiver, Sender, bounded};

use super::core::ExecutionContext;
use super::harness;
use crate::error::BatchError;
use crate::work::{ExecutorTag, WorkItem, WorkResult};

/// Channel buffer = workers * multiplier
const CHANNEL_BUFFER_MULTIPLIER: usize = 2;

/// Run every item on a fixed pool of OS threads
///
/// The pool lives on a blocking thread so the calling runtime stays free
/// for whatever runs next to it (the cooperative half of a hybrid batch).
pub async fn run(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || run_blocking(items, &ctx))
        .await
        .map_err(|e| BatchError::crashed("thread pool", e))?
}

/// Producer thread, `min(worker_count, items)` workers and a collector on
/// the calling thread
pub fn run_blocking(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let workers = ctx.pool.thread_workers(items.len());
    tracing::debug!("Starting thread pool: {} workers for {} items", workers, items.len());

    let (work_tx, work_rx): (Sender<WorkItem>, Receiver<WorkItem>) =
        bounded(workers * CHANNEL_BUFFER_MULTIPLIER);
    let (result_tx, result_rx): (Sender<WorkResult>, Receiver<WorkResult>) =
        bounded(workers * CHANNEL_BUFFER_MULTIPLIER * 2);

    crossbeam::thread::scope(|s| {
        for worker in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move |_| worker_loop(worker, work_rx, result_tx, ctx));
        }

        s.spawn(move |_| {
            for item in items {
                if ctx.cancel.is_cancelled() || work_tx.send(item).is_err() {
                    break;
                }
            }
        });

        // Only the clones held by the threads keep the channels open now
        drop(work_rx);
        drop(result_tx);

        while let Ok(result) = result_rx.recv() {
            ctx.record(result);
        }
    })
    .map_err(|_| BatchError::crashed("thread pool", "a worker thread panicked outside the per-item boundary"))?;

    match ctx.cancellation() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn worker_loop(
    worker: usize,
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<WorkResult>,
    ctx: &ExecutionContext,
) {
    while let Ok(item) = work_rx.recv() {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let result = {
            let _permit = ctx.admission.acquire_blocking();
            harness::run_blocking(
                &ctx.function,
                &item.identifier,
                ctx.settings,
                ExecutorTag::Thread { worker },
            )
        };

        if result_tx.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::testing::{Instrumented, context};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_every_item_recorded_once() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(2)));
        let items = WorkItem::batch((0..50).map(|i| format!("item-{i}")));
        let ctx = context(function, 50, items.len());

        run_blocking(items.clone(), &ctx).unwrap();

        let seen: HashSet<_> = ctx.results.snapshot().into_iter().map(|r| r.identifier).collect();
        assert_eq!(ctx.results.len(), 50);
        assert_eq!(seen.len(), 50);
        assert!(items.iter().all(|item| seen.contains(&item.identifier)));
    }

    #[test]
    fn test_worker_ids_stay_inside_pool() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(1)));
        let items = WorkItem::batch((0..20).map(|i| format!("item-{i}")));
        let mut ctx = context(function, 50, items.len());
        ctx.pool.worker_count = 3;

        run_blocking(items, &ctx).unwrap();

        for result in ctx.results.snapshot() {
            match result.executor {
                ExecutorTag::Thread { worker } => assert!(worker < 3),
                other => panic!("unexpected executor {other}"),
            }
        }
    }

    #[test]
    fn test_admission_caps_below_worker_count() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(15)));
        let items = WorkItem::batch((0..24).map(|i| format!("item-{i}")));
        let mut ctx = context(function.clone(), 2, items.len());
        ctx.pool.worker_count = 8;

        run_blocking(items, &ctx).unwrap();

        assert!(function.high_water_mark() <= 2);
        assert_eq!(ctx.admission.high_water_mark(), 2);
        assert_eq!(ctx.results.len(), 24);
    }

    #[test]
    fn test_cancelled_pool_reports_shortfall() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(20)));
        let items = WorkItem::batch((0..40).map(|i| format!("item-{i}")));
        let mut ctx = context(function, 50, items.len());
        ctx.pool.worker_count = 2;
        ctx.cancel.cancel();

        let err = run_blocking(items, &ctx).unwrap_err();
        assert!(matches!(err, BatchError::Cancelled { expected: 40, .. }));
        assert_eq!(ctx.admission.in_flight(), 0);
    }

    #[test]
    fn test_stuck_item_times_out_without_stalling_pool() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(1)).hanging(["item-1"]));
        let items = WorkItem::batch((0..6).map(|i| format!("item-{i}")));
        let mut ctx = context(function, 4, items.len());
        ctx.pool.worker_count = 2;
        ctx.settings.timeout = Duration::from_millis(100);

        run_blocking(items, &ctx).unwrap();

        let results = ctx.results.snapshot();
        assert_eq!(results.len(), 6);
        let stuck = results.iter().find(|r| r.identifier == "item-1").unwrap();
        assert_eq!(stuck.error.as_deref(), Some("Timeout Error: exceeded 100ms"));
        assert_eq!(ctx.results.summary().successful, 5);
        assert_eq!(ctx.admission.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_async_entry_point() {
        let function = Arc::new(Instrumented::new(Duration::from_millis(1)).failing(["item-2"]));
        let items = WorkItem::batch((0..5).map(|i| format!("item-{i}")));
        let ctx = context(function, 4, items.len());

        run(items, &ctx).await.unwrap();

        let summary = ctx.results.summary();
        assert_eq!((summary.successful, summary.failed), (4, 1));
        assert_eq!(summary.executors.thread, 5);
    }
}

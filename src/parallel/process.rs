//! Fixed pool of worker processes
//!
//! The parent starts `<program> worker` once per pool slot and talks to each
//! child over JSON Lines on its stdin/stdout (see [`crate::work::wire`]).
//! Each child rebuilds the work function from its [`WorkKind`], so only
//! functions with a wire kind can run here. Inputs and results cross the
//! boundary by value.
//!
//! A child that exits or garbles a frame is a crashed execution unit: the
//! batch fails with [`BatchError::WorkerCrashed`] after recording whatever
//! results did come back.

use crossbeam::channel::{Receiver, Sender, unbounded};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::process::{ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::core::ExecutionContext;
use super::harness::{self, ItemSettings};
use crate::error::BatchError;
use crate::work::wire::{WorkerHello, WorkerReply, WorkerRequest, read_frame, write_frame};
use crate::work::{ExecutorTag, WorkItem, WorkKind, WorkResult};

/// Subcommand the parent passes to start a child in worker mode
pub const WORKER_SUBCOMMAND: &str = "worker";

pub async fn run(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || run_blocking(items, &ctx))
        .await
        .map_err(|e| BatchError::crashed("process pool", e))?
}

/// Drive the pool from the calling thread; one driver thread per child
///
/// Results are buffered by submission position and recorded in input order
/// once every driver has finished.
pub fn run_blocking(items: Vec<WorkItem>, ctx: &ExecutionContext) -> Result<(), BatchError> {
    if items.is_empty() {
        return Ok(());
    }

    let kind = ctx.function.wire_kind().ok_or_else(|| BatchError::NotTransferable {
        function: ctx.function.name().to_string(),
    })?;
    let program = ctx
        .pool
        .program()
        .map_err(|e| BatchError::crashed("process pool", format!("cannot locate worker program: {e}")))?;

    let total = items.len();
    let workers = ctx.pool.process_workers(total, ctx.admission.max_concurrency());
    tracing::debug!(
        "Starting process pool: {} x '{} {}' for {} items",
        workers,
        program.display(),
        WORKER_SUBCOMMAND,
        total
    );

    let (work_tx, work_rx) = unbounded::<(usize, WorkItem)>();
    for entry in items.into_iter().enumerate() {
        // The receiver is alive until the scope below ends
        let _ = work_tx.send(entry);
    }
    drop(work_tx);

    let (reply_tx, reply_rx) = unbounded::<(usize, WorkResult)>();

    let outcomes: Vec<Result<(), BatchError>> = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let work_rx = work_rx.clone();
                let reply_tx = reply_tx.clone();
                let program = program.as_path();
                s.spawn(move |_| drive_worker(worker, program, kind, work_rx, reply_tx, ctx))
            })
            .collect();
        drop(reply_tx);

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(BatchError::crashed(
                        format!("process driver {worker}"),
                        "driver thread panicked",
                    ))
                })
            })
            .collect()
    })
    .map_err(|_| BatchError::crashed("process pool", "driver thread panicked"))?;

    let mut slots: Vec<Option<WorkResult>> = (0..total).map(|_| None).collect();
    for (position, result) in reply_rx.try_iter() {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(result);
        }
    }
    for result in slots.into_iter().flatten() {
        ctx.record(result);
    }

    if let Some(crash) = outcomes.into_iter().find_map(|outcome| outcome.err()) {
        return Err(crash);
    }
    match ctx.cancellation() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn drive_worker(
    worker: usize,
    program: &Path,
    kind: WorkKind,
    work_rx: Receiver<(usize, WorkItem)>,
    reply_tx: Sender<(usize, WorkResult)>,
    ctx: &ExecutionContext,
) -> Result<(), BatchError> {
    let mut child = Command::new(program)
        .arg(WORKER_SUBCOMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| {
            BatchError::crashed(
                format!("process worker {worker}"),
                format!("failed to start {}: {e}", program.display()),
            )
        })?;

    let unit = format!("process worker {worker} (pid {})", child.id());
    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(BatchError::crashed(unit, "child stdio was not captured"));
    };

    let hello = WorkerHello {
        kind,
        worker,
        truncate_length: ctx.settings.truncate_length,
        timeout_ms: ctx.settings.timeout.as_millis() as u64,
    };
    let session = converse(&unit, hello, stdin, BufReader::new(stdout), &work_rx, &reply_tx, ctx);

    if session.is_err() {
        let _ = child.kill();
    }
    match child.wait() {
        Ok(status) if !status.success() && session.is_ok() => {
            tracing::warn!("{} exited with {} after finishing its items", unit, status);
        }
        Err(e) => tracing::warn!("Failed to reap {}: {}", unit, e),
        _ => {}
    }
    session
}

/// Hello, then one request/reply round trip per item until the queue drains
///
/// Dropping `stdin` on return closes the child's input, which ends its loop.
fn converse(
    unit: &str,
    hello: WorkerHello,
    stdin: ChildStdin,
    mut stdout: BufReader<ChildStdout>,
    work_rx: &Receiver<(usize, WorkItem)>,
    reply_tx: &Sender<(usize, WorkResult)>,
    ctx: &ExecutionContext,
) -> Result<(), BatchError> {
    let mut stdin = BufWriter::new(stdin);
    write_frame(&mut stdin, &hello).map_err(|e| BatchError::crashed(unit, format!("handshake failed: {e}")))?;

    while let Ok((position, item)) = work_rx.recv() {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let _permit = ctx.admission.acquire_blocking();
        let request = WorkerRequest {
            index: position,
            identifier: item.identifier,
        };
        write_frame(&mut stdin, &request).map_err(|e| {
            BatchError::crashed(unit, format!("lost while sending '{}': {e}", request.identifier))
        })?;

        match read_frame::<_, WorkerReply>(&mut stdout) {
            Ok(Some(reply)) if reply.index == position => {
                if reply_tx.send((position, reply.result)).is_err() {
                    break;
                }
            }
            Ok(Some(reply)) => {
                return Err(BatchError::crashed(
                    unit,
                    format!("answered item {} while {} was pending", reply.index, position),
                ));
            }
            Ok(None) => {
                return Err(BatchError::crashed(
                    unit,
                    format!("exited before returning a result for '{}'", request.identifier),
                ));
            }
            Err(e) => {
                return Err(BatchError::crashed(
                    unit,
                    format!("unreadable reply for '{}': {e}", request.identifier),
                ));
            }
        }
    }
    Ok(())
}

/// Child side of the pool: answer requests until stdin closes
///
/// Every request goes through the same per-item boundary as the in-process
/// strategies, so a failing item is a failed reply, never a dead worker.
pub async fn serve_worker<R, W>(reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use anyhow::Context;

    let mut lines = reader.lines();
    let Some(first) = lines.next_line().await? else {
        return Ok(());
    };
    let hello: WorkerHello = serde_json::from_str(&first).context("Invalid worker handshake")?;

    let settings = ItemSettings {
        truncate_length: hello.truncate_length,
        timeout: Duration::from_millis(hello.timeout_ms),
    };
    let function = hello.kind.instantiate(settings.timeout)?;
    let executor = ExecutorTag::Process {
        pid: std::process::id(),
        worker: hello.worker,
    };
    tracing::debug!("Worker {} ready for {:?}", executor, hello.kind);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: WorkerRequest = serde_json::from_str(&line).context("Invalid worker request")?;
        let result = harness::run_async(function.as_ref(), &request.identifier, settings, executor).await;

        let mut frame = serde_json::to_vec(&WorkerReply {
            index: request.index,
            result,
        })?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::testing::{Instrumented, context};
    use crate::work::FileReader;
    use std::sync::Arc;

    fn hello(kind: WorkKind) -> String {
        serde_json::to_string(&WorkerHello {
            kind,
            worker: 2,
            truncate_length: 4,
            timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_serve_worker_answers_each_request() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.txt");
        std::fs::write(&present, "hello world").unwrap();
        let missing = dir.path().join("missing.txt");

        let input = format!(
            "{}\n{}\n{}\n",
            hello(WorkKind::ReadFile),
            serde_json::to_string(&WorkerRequest {
                index: 0,
                identifier: present.display().to_string()
            })
            .unwrap(),
            serde_json::to_string(&WorkerRequest {
                index: 1,
                identifier: missing.display().to_string()
            })
            .unwrap(),
        );
        let mut output = Vec::new();
        serve_worker(input.as_bytes(), &mut output).await.unwrap();

        let replies: Vec<WorkerReply> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].result.payload_preview, "hell...");
        assert_eq!(replies[0].result.size, 11);
        assert!(matches!(
            replies[0].result.executor,
            ExecutorTag::Process { worker: 2, .. }
        ));
        assert!(replies[1].result.error.as_deref().unwrap().starts_with("I/O error"));
    }

    #[tokio::test]
    async fn test_serve_worker_rejects_bad_handshake() {
        let mut output = Vec::new();
        let err = serve_worker("{\"kind\":\"nope\"}\n".as_bytes(), &mut output)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("handshake"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_untransferable_function_is_rejected() {
        let function = Arc::new(Instrumented::new(Duration::ZERO));
        let ctx = context(function, 4, 1);

        let err = run_blocking(WorkItem::batch(["a"]), &ctx).unwrap_err();
        assert!(matches!(err, BatchError::NotTransferable { .. }));
        assert!(ctx.results.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_dead_child_is_a_crashed_unit() {
        let mut ctx = context(Arc::new(FileReader::new()), 4, 3);
        ctx.pool.process_count = 1;
        ctx.pool.worker_program = Some("true".into());

        let err = run_blocking(WorkItem::batch(["a", "b", "c"]), &ctx).unwrap_err();
        assert!(matches!(err, BatchError::WorkerCrashed { .. }), "{err}");
        assert!(ctx.results.len() < 3);
    }

    #[test]
    fn test_missing_program_is_a_crashed_unit() {
        let mut ctx = context(Arc::new(FileReader::new()), 4, 1);
        ctx.pool.worker_program = Some("/definitely/not/a/batchio/binary".into());

        let err = run_blocking(WorkItem::batch(["a"]), &ctx).unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}

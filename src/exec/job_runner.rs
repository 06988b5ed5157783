// src/exec/job_runner.rs

//! Individual job process runner.

use std::collections::VecDeque;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::compiler::InvocationPlan;
use crate::engine::EngineEvent;
use crate::exec::ExecutionEvent;
use crate::exec::progress::ProgressParser;
use crate::registry::JobId;

/// How many trailing stderr lines are kept for the failure diagnostic.
const DIAGNOSTIC_TAIL: usize = 8;

/// Synthetic percent reported for non-incremental (snapshot) operations to
/// signal "in flight" while the process runs.
const SNAPSHOT_PERCENT: u8 = 50;

/// Run a single job process to its terminal event.
///
/// Guarantees exactly one terminal event (`JobCompleted` or `JobFailed`)
/// per invocation, with zero or more `JobProgress` events strictly before
/// it. If the cancel channel fires, the child is killed and a
/// `Failed{"cancelled"}` terminal is synthesized instead.
pub async fn run_job(
    id: JobId,
    plan: InvocationPlan,
    engine_tx: mpsc::Sender<EngineEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    // Fast fail: the input may have disappeared between validation and
    // dispatch. Checked here so the diagnostic is ours, not the tool's.
    if !plan.input_path.is_file() {
        let message = format!("input file not found: {}", plan.input_path.display());
        send_failed(&engine_tx, &id, message).await;
        return;
    }

    info!(
        job = %id,
        program = %plan.program.display(),
        incremental = plan.incremental,
        "starting job process"
    );
    debug!(job = %id, args = ?plan.args, "compiled arguments");

    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            let message = format!("failed to start {}: {err}", plan.program.display());
            send_failed(&engine_tx, &id, message).await;
            return;
        }
    };

    // Snapshot operations have no progress stream; emit one synthetic
    // in-flight marker immediately after spawn.
    if !plan.incremental {
        let _ = engine_tx
            .send(EngineEvent::from_execution(
                id.clone(),
                ExecutionEvent::Progress {
                    percent: SNAPSHOT_PERCENT,
                    timemark: String::new(),
                },
            ))
            .await;
    }

    // Always consume stdout so buffers don't fill; the tool writes its
    // interesting output to stderr.
    if let Some(stdout) = child.stdout.take() {
        let job = id.clone();
        tokio::spawn(async move {
            let _ = scan_lines(stdout, |line| {
                debug!(job = %job, "stdout: {line}");
            })
            .await;
        });
    }

    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| spawn_stderr_task(stderr, id.clone(), plan.incremental, engine_tx.clone()));

    // Either the process exits on its own, or a cancellation request
    // arrives and we kill it.
    let status = tokio::select! {
        status = child.wait() => Some(status),
        cancel = &mut cancel_rx => match cancel {
            Ok(()) => {
                info!(job = %id, "cancellation requested; killing process");
                if let Err(err) = child.kill().await {
                    warn!(job = %id, error = %err, "failed to kill child on cancellation");
                }
                None
            }
            // Cancel sender dropped without firing; keep waiting normally.
            Err(_) => Some(child.wait().await),
        },
    };

    // Drain stderr to completion before any terminal event so no progress
    // can be observed after it.
    let tail = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    match status {
        None => {
            send_failed(&engine_tx, &id, "cancelled".to_string()).await;
        }
        Some(Err(err)) => {
            send_failed(&engine_tx, &id, format!("failed waiting for process: {err}")).await;
        }
        Some(Ok(status)) if status.success() => {
            info!(job = %id, output = %plan.output_path.display(), "job process completed");
            let _ = engine_tx
                .send(EngineEvent::from_execution(
                    id.clone(),
                    ExecutionEvent::Completed {
                        output_path: plan.output_path.clone(),
                    },
                ))
                .await;
        }
        Some(Ok(status)) => {
            // Pass the tool's diagnostic text through verbatim.
            let message = if tail.is_empty() {
                format!("process exited with status {status}")
            } else {
                tail.join("\n")
            };
            info!(job = %id, %status, "job process failed");
            send_failed(&engine_tx, &id, message).await;
        }
    }
}

async fn send_failed(engine_tx: &mpsc::Sender<EngineEvent>, id: &JobId, message: String) {
    let _ = engine_tx
        .send(EngineEvent::from_execution(
            id.clone(),
            ExecutionEvent::Failed { message },
        ))
        .await;
}

/// Parse stderr for progress (incremental plans only) and keep a tail of
/// recent lines for failure diagnostics.
fn spawn_stderr_task(
    stderr: impl AsyncRead + Unpin + Send + 'static,
    id: JobId,
    incremental: bool,
    engine_tx: mpsc::Sender<EngineEvent>,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut parser = ProgressParser::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
        // Progress sends come from a sync line callback; buffer them through
        // an unbounded channel and forward below.
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();

        let reader = tokio::spawn(async move {
            let _ = scan_lines(stderr, |line| {
                let _ = line_tx.send(line.to_string());
            })
            .await;
        });

        while let Some(line) = line_rx.recv().await {
            debug!(job = %id, "stderr: {line}");

            if tail.len() == DIAGNOSTIC_TAIL {
                tail.pop_front();
            }
            tail.push_back(line.clone());

            if incremental
                && let Some(update) = parser.push_line(&line)
            {
                let _ = engine_tx
                    .send(EngineEvent::from_execution(
                        id.clone(),
                        ExecutionEvent::Progress {
                            percent: update.percent,
                            timemark: update.timemark,
                        },
                    ))
                    .await;
            }
        }

        let _ = reader.await;
        tail.into_iter().collect()
    })
}

/// Read a byte stream and invoke the callback per line.
///
/// ffmpeg rewrites its stats line using carriage returns, so both `\n` and
/// `\r` terminate a line here.
async fn scan_lines<R, F>(mut reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    on_line(&String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        on_line(&String::from_utf8_lossy(&pending));
    }
    Ok(())
}

// src/exec/executor_loop.rs

//! Executor loop that manages running job processes.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::compiler::InvocationPlan;
use crate::engine::EngineEvent;
use crate::exec::job_runner::run_job;
use crate::registry::JobId;

/// Requests from the runtime to the background executor.
#[derive(Debug)]
pub enum ExecutorRequest {
    Run { id: JobId, plan: InvocationPlan },
    Cancel { id: JobId },
}

/// Internal handle for a currently-running job process.
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each dispatched job runs in its own Tokio task as an independent unit of
/// work; the loop enforces that **exactly one external process is ever
/// associated with a given job**. A second `Run` for an id whose process is
/// still alive is ignored — jobs never restart themselves.
pub fn spawn_executor(engine_tx: mpsc::Sender<EngineEvent>) -> mpsc::Sender<ExecutorRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutorRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<JobId, ActiveJob> = HashMap::new();

        while let Some(request) = rx.recv().await {
            // Drop bookkeeping for runners that have finished.
            active.retain(|_, job| !job.handle.is_finished());

            match request {
                ExecutorRequest::Run { id, plan } => {
                    handle_run(id, plan, &mut active, &engine_tx);
                }
                ExecutorRequest::Cancel { id } => {
                    handle_cancel(&id, &mut active);
                }
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_run(
    id: JobId,
    plan: InvocationPlan,
    active: &mut HashMap<JobId, ActiveJob>,
    engine_tx: &mpsc::Sender<EngineEvent>,
) {
    if let Some(existing) = active.get(&id)
        && !existing.handle.is_finished()
    {
        warn!(job = %id, "job already has a live process; ignoring duplicate run request");
        return;
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let tx = engine_tx.clone();
    let spawn_id = id.clone();
    let run_id = id.clone();

    let handle = tokio::spawn(async move {
        run_job(run_id, plan, tx, cancel_rx).await;
        debug!(job = %spawn_id, "job runner future finished");
    });

    active.insert(
        id,
        ActiveJob {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn handle_cancel(id: &JobId, active: &mut HashMap<JobId, ActiveJob>) {
    let Some(existing) = active.get_mut(id) else {
        debug!(job = %id, "cancel for unknown or finished job; ignoring");
        return;
    };

    match existing.cancel.take() {
        Some(cancel) => {
            if cancel.send(()).is_err() {
                debug!(job = %id, "process already finished while cancelling");
            }
        }
        None => {
            debug!(job = %id, "cancel already requested for this job");
        }
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use mediaforge::compiler::InvocationPlan;
use mediaforge::engine::EngineEvent;
use mediaforge::errors::{EngineError, Result};
use mediaforge::exec::ExecutorBackend;
use mediaforge::registry::JobId;

/// A fake executor that:
/// - records which jobs were "run"
/// - immediately reports one progress tick and a terminal event per job.
pub struct FakeExecutor {
    engine_tx: mpsc::Sender<EngineEvent>,
    dispatched: Arc<Mutex<Vec<JobId>>>,
    failing: Vec<JobId>,
}

impl FakeExecutor {
    pub fn new(engine_tx: mpsc::Sender<EngineEvent>, dispatched: Arc<Mutex<Vec<JobId>>>) -> Self {
        Self {
            engine_tx,
            dispatched,
            failing: Vec::new(),
        }
    }

    /// Make the given job report `Failed` instead of `Completed`.
    pub fn failing(mut self, id: JobId) -> Self {
        self.failing.push(id);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<(JobId, InvocationPlan)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.engine_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let failing = self.failing.clone();

        Box::pin(async move {
            for (id, plan) in jobs {
                {
                    let mut guard = dispatched.lock().unwrap();
                    guard.push(id.clone());
                }

                tx.send(EngineEvent::JobProgress {
                    id: id.clone(),
                    percent: 42,
                    timemark: "00:00:01.00".to_string(),
                })
                .await
                .map_err(|_| EngineError::EngineClosed)?;

                let terminal = if failing.contains(&id) {
                    EngineEvent::JobFailed {
                        id,
                        message: "simulated failure".to_string(),
                    }
                } else {
                    EngineEvent::JobCompleted {
                        id,
                        output_path: plan.output_path,
                    }
                };
                tx.send(terminal).await.map_err(|_| EngineError::EngineClosed)?;
            }
            Ok(())
        })
    }

    fn cancel_job(&mut self, _id: JobId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Jobs finish instantly; there is never a process to cancel.
        Box::pin(async { Ok(()) })
    }
}

/// An executor whose jobs never finish on their own: dispatches are only
/// recorded, keeping the jobs "running" until the test injects a terminal
/// event. Cancellations report `Failed{"cancelled"}`, mimicking the real
/// runner's kill path.
pub struct HoldingExecutor {
    engine_tx: mpsc::Sender<EngineEvent>,
    dispatched: Arc<Mutex<Vec<JobId>>>,
    cancelled: Arc<Mutex<Vec<JobId>>>,
}

impl HoldingExecutor {
    pub fn new(
        engine_tx: mpsc::Sender<EngineEvent>,
        dispatched: Arc<Mutex<Vec<JobId>>>,
        cancelled: Arc<Mutex<Vec<JobId>>>,
    ) -> Self {
        Self {
            engine_tx,
            dispatched,
            cancelled,
        }
    }
}

impl ExecutorBackend for HoldingExecutor {
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<(JobId, InvocationPlan)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let dispatched = Arc::clone(&self.dispatched);

        Box::pin(async move {
            let mut guard = dispatched.lock().unwrap();
            for (id, _) in jobs {
                guard.push(id);
            }
            Ok(())
        })
    }

    fn cancel_job(&mut self, id: JobId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.engine_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);

        Box::pin(async move {
            {
                let mut guard = cancelled.lock().unwrap();
                guard.push(id.clone());
            }
            tx.send(EngineEvent::JobFailed {
                id,
                message: "cancelled".to_string(),
            })
            .await
            .map_err(|_| EngineError::EngineClosed)?;
            Ok(())
        })
    }
}

// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::{ExecutionEvent, ExecutorBackend};
use crate::notify::{JobNotification, NotificationBridge};
use crate::registry::{JobId, JobRegistry};

use super::core::EngineCore;
use super::{CoreCommand, EngineEvent};

/// Drives job execution in response to `EngineEvent`s.
///
/// This is a pure IO shell around [`EngineCore`], which contains the
/// admission semantics. The shell folds per-job events into the registry
/// (the single owner of job state), publishes the resulting snapshots to
/// observers, and delegates process execution to an `ExecutorBackend`.
pub struct Runtime<E: ExecutorBackend> {
    core: EngineCore,
    registry: Arc<JobRegistry>,
    notifier: NotificationBridge,
    event_rx: mpsc::Receiver<EngineEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: EngineCore,
        registry: Arc<JobRegistry>,
        notifier: NotificationBridge,
        event_rx: mpsc::Receiver<EngineEvent>,
        executor: E,
    ) -> Self {
        Self {
            core,
            registry,
            notifier,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `EngineEvent`s from `event_rx`.
    /// - Folds job events into the registry and notifies observers.
    /// - Feeds events into the pure core and executes the returned commands.
    pub async fn run(mut self) -> Result<()> {
        info!("engine runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(event) => event,
                None => {
                    info!("engine event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            self.fold_into_registry(&event);

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Apply a job event to the registry and forward the update to
    /// observers. Events the registry drops (terminal or unknown jobs) are
    /// never forwarded.
    fn fold_into_registry(&self, event: &EngineEvent) {
        let (id, execution) = match event {
            EngineEvent::JobProgress {
                id,
                percent,
                timemark,
            } => (
                id,
                ExecutionEvent::Progress {
                    percent: *percent,
                    timemark: timemark.clone(),
                },
            ),
            EngineEvent::JobCompleted { id, output_path } => (
                id,
                ExecutionEvent::Completed {
                    output_path: output_path.clone(),
                },
            ),
            EngineEvent::JobFailed { id, message } => (
                id,
                ExecutionEvent::Failed {
                    message: message.clone(),
                },
            ),
            _ => return,
        };

        self.apply_and_notify(id, execution);
    }

    fn apply_and_notify(&self, id: &JobId, event: ExecutionEvent) {
        if self.registry.apply_event(id, &event).is_some() {
            self.notifier
                .publish(JobNotification::from_execution(id.clone(), &event));
        } else {
            debug!(job = %id, "event dropped by registry; not forwarded");
        }
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(jobs) => {
                for (id, _) in &jobs {
                    self.registry.mark_running(id);
                }
                let ids: Vec<&str> = jobs.iter().map(|(id, _)| id.as_str()).collect();
                debug!(?ids, "dispatching jobs to executor");
                self.executor.dispatch_jobs(jobs).await?;
            }
            CoreCommand::CancelProcess(id) => {
                self.executor.cancel_job(id).await?;
            }
            CoreCommand::FailJob { id, message } => {
                self.apply_and_notify(&id, ExecutionEvent::Failed { message });
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}

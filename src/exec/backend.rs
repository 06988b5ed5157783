// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor implementation in [`executor_loop`].
//!
//! [`executor_loop`]: crate::exec::executor_loop

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::compiler::InvocationPlan;
use crate::engine::EngineEvent;
use crate::errors::{EngineError, Result};
use crate::registry::JobId;

use super::executor_loop::{ExecutorRequest, spawn_executor};

/// Trait abstracting how dispatched jobs are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Start the given jobs' external processes.
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<(JobId, InvocationPlan)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Request termination of a running job's process. The terminal
    /// `Failed{"cancelled"}` event flows back through the normal channel.
    fn cancel_job(&mut self, id: JobId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Wraps the background loop in [`spawn_executor`] and forwards requests
/// over an mpsc channel.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecutorRequest>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend wired to the given engine event
    /// sender. This spawns the background executor loop immediately.
    pub fn new(engine_tx: mpsc::Sender<EngineEvent>) -> Self {
        let tx = spawn_executor(engine_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<(JobId, InvocationPlan)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for (id, plan) in jobs {
                tx.send(ExecutorRequest::Run { id, plan })
                    .await
                    .map_err(|_| EngineError::EngineClosed)?;
            }
            Ok(())
        })
    }

    fn cancel_job(&mut self, id: JobId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(ExecutorRequest::Cancel { id })
                .await
                .map_err(|_| EngineError::EngineClosed)?;
            Ok(())
        })
    }
}

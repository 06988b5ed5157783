// src/engine/mod.rs

//! Job orchestration engine.
//!
//! This module ties together:
//! - the bounded admission pool (slots + FIFO queue for overflow jobs)
//! - the main runtime event loop that reacts to:
//!   - newly submitted jobs
//!   - progress and terminal events from job processes
//!   - cancellation requests
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::compiler::InvocationPlan;
use crate::exec::ExecutionEvent;
use crate::registry::JobId;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no job is running or pending
    /// (used by the one-shot CLI path).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from submitters and job processes.
///
/// Events for a single job arrive in production order; events for
/// different jobs interleave freely.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A validated, compiled job was accepted and awaits a slot.
    JobQueued { id: JobId, plan: InvocationPlan },
    /// A job process reported normalized progress.
    JobProgress {
        id: JobId,
        percent: u8,
        timemark: String,
    },
    /// A job process exited cleanly.
    JobCompleted { id: JobId, output_path: PathBuf },
    /// A job process failed, could not be spawned, or was cancelled.
    JobFailed { id: JobId, message: String },
    /// A caller asked for the job to be cancelled.
    CancelRequested { id: JobId },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

impl EngineEvent {
    /// Tag a per-process execution event with its job id.
    pub fn from_execution(id: JobId, event: ExecutionEvent) -> Self {
        match event {
            ExecutionEvent::Progress { percent, timemark } => EngineEvent::JobProgress {
                id,
                percent,
                timemark,
            },
            ExecutionEvent::Completed { output_path } => {
                EngineEvent::JobCompleted { id, output_path }
            }
            ExecutionEvent::Failed { message } => EngineEvent::JobFailed { id, message },
        }
    }
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreStep, EngineCore};
pub use runtime::Runtime;

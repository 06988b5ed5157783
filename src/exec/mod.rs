// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs compiled invocation plans with `tokio::process::Command`
//! and reports back to the engine runtime via `EngineEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production; tests swap in fakes.
//! - [`executor_loop`] owns the executor loop managing active job processes
//!   and their cancellation handles.
//! - [`job_runner`] handles a single external-process execution.
//! - [`progress`] normalizes the tool's raw progress stream.

pub mod backend;
pub mod executor_loop;
pub mod job_runner;
pub mod progress;

use std::path::PathBuf;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{ExecutorRequest, spawn_executor};
pub use progress::{ProgressParser, ProgressUpdate};

/// Event stream produced for one invocation: zero or more `Progress`
/// events, then exactly one terminal `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    Progress { percent: u8, timemark: String },
    /// Clean process exit; carries the plan's declared output path. The
    /// executor does not re-verify that the file exists (trust boundary
    /// with the external tool).
    Completed { output_path: PathBuf },
    Failed { message: String },
}

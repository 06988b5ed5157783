// src/registry/mod.rs

//! Authoritative in-memory state for all jobs.
//!
//! The registry is the sole owner of a job's mutable fields. Executors only
//! supply events; [`JobRegistry::apply_event`] folds them in under the
//! state-machine rules:
//!
//! - `queued → running → {done | error}`, or `queued → error` (fast fail)
//! - no transition out of a terminal state; late events are dropped silently
//! - `progress` is clamped to 0–100, never decreases while running, and is
//!   forced to 100 on `done`

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::OperationKind;
use crate::errors::{EngineError, Result};
use crate::exec::ExecutionEvent;

/// Opaque job identifier; assigned at submission, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// One tracked request to perform a media operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub operation: OperationKind,
    pub label: String,
    pub input_path: PathBuf,
    /// `None` until the job reaches `done`.
    pub output_path: Option<PathBuf>,
    pub status: JobStatus,
    /// 0–100; meaningful while `running`, frozen on terminal transition.
    pub progress: u8,
    /// Last-seen elapsed-time marker; advisory only.
    pub timemark: String,
    /// `None` unless `status == error`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Shared registry of all jobs.
///
/// Safe under concurrent invocation: per-job updates arrive in production
/// order through the runtime's event channel, and the inner mutex serializes
/// structural operations (`list`, `remove`, `clear_terminal`) against them.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job in `queued` state and return its id.
    ///
    /// A caller-supplied id is used as-is but must be free: ids are never
    /// reused, so a collision with an existing record (live or terminal) is
    /// rejected instead of replacing it. The check and the insert happen
    /// under one lock, so concurrent submits cannot both claim the same id.
    pub fn create(
        &self,
        id: Option<JobId>,
        operation: OperationKind,
        label: impl Into<String>,
        input_path: PathBuf,
    ) -> Result<JobId> {
        let mut jobs = self.lock();

        let id = match id {
            Some(id) => {
                if jobs.contains_key(&id) {
                    return Err(EngineError::DuplicateJob(id));
                }
                id
            }
            None => JobId::generate(),
        };

        let job = Job {
            id: id.clone(),
            operation,
            label: label.into(),
            input_path,
            output_path: None,
            status: JobStatus::Queued,
            progress: 0,
            timemark: String::new(),
            error: None,
            created_at: Utc::now(),
        };

        jobs.insert(id.clone(), job);
        Ok(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.lock().contains_key(id)
    }

    /// Transition `queued → running` when the executor picks the job up.
    /// No-op for any other state.
    pub fn mark_running(&self, id: &JobId) {
        let mut jobs = self.lock();
        if let Some(job) = jobs.get_mut(id)
            && job.status == JobStatus::Queued
        {
            job.status = JobStatus::Running;
            debug!(job = %id, "job running");
        }
    }

    /// Fold an execution event into the job's state.
    ///
    /// Returns the updated snapshot, or `None` when the event was dropped
    /// (unknown job, or the job is already terminal). Dropped events must
    /// not be forwarded to observers.
    pub fn apply_event(&self, id: &JobId, event: &ExecutionEvent) -> Option<Job> {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            warn!(job = %id, "dropping event for unknown job");
            return None;
        };

        if job.status.is_terminal() {
            debug!(job = %id, status = ?job.status, "dropping event for terminal job");
            return None;
        }

        match event {
            ExecutionEvent::Progress { percent, timemark } => {
                job.status = JobStatus::Running;
                job.progress = job.progress.max((*percent).min(100));
                if !timemark.is_empty() {
                    job.timemark = timemark.clone();
                }
            }
            ExecutionEvent::Completed { output_path } => {
                job.status = JobStatus::Done;
                job.progress = 100;
                job.output_path = Some(output_path.clone());
            }
            ExecutionEvent::Failed { message } => {
                job.status = JobStatus::Error;
                // Terminal errors always carry a displayable message.
                job.error = Some(if message.is_empty() {
                    "transcoding failed".to_string()
                } else {
                    message.clone()
                });
            }
        }

        Some(job.clone())
    }

    pub fn remove(&self, id: &JobId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Remove all jobs in `done`/`error` state; returns how many went away.
    pub fn clear_terminal(&self) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, job| !job.status.is_terminal());
        before - jobs.len()
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Snapshot of all jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.lock();
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().expect("job registry lock poisoned")
    }
}

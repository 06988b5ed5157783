// src/notify.rs

//! Fan-out of registry state changes to observers.
//!
//! The bridge sits between the runtime and whatever presentation layer is
//! listening. Delivery is fire-and-forget: publishing never blocks, and a
//! slow observer lags (losing old updates) rather than stalling job
//! execution. Per-job ordering is preserved because all notifications are
//! published from the single runtime loop.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::exec::ExecutionEvent;
use crate::registry::JobId;

/// Push payload for one job state change, in the wire shape observers
/// expect: `{"type": "progress", "percent": .., "timemark": ..}` etc.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationPayload {
    #[serde(rename_all = "camelCase")]
    Progress { percent: u8, timemark: String },
    #[serde(rename_all = "camelCase")]
    Completed { output_path: PathBuf },
    #[serde(rename_all = "camelCase")]
    Failed { message: String },
}

/// A state-change notification keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNotification {
    pub job_id: JobId,
    #[serde(flatten)]
    pub payload: NotificationPayload,
}

impl JobNotification {
    pub fn from_execution(job_id: JobId, event: &ExecutionEvent) -> Self {
        let payload = match event {
            ExecutionEvent::Progress { percent, timemark } => NotificationPayload::Progress {
                percent: *percent,
                timemark: timemark.clone(),
            },
            ExecutionEvent::Completed { output_path } => NotificationPayload::Completed {
                output_path: output_path.clone(),
            },
            ExecutionEvent::Failed { message } => NotificationPayload::Failed {
                message: message.clone(),
            },
        };
        Self { job_id, payload }
    }
}

/// Broadcast-based observer registration.
///
/// The registry/runtime side does not know who is listening; observers come
/// and go via [`subscribe`](NotificationBridge::subscribe).
#[derive(Debug, Clone)]
pub struct NotificationBridge {
    tx: broadcast::Sender<JobNotification>,
}

impl NotificationBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobNotification> {
        self.tx.subscribe()
    }

    /// Publish to all current observers. Never blocks; having no observers
    /// is not an error.
    pub fn publish(&self, notification: JobNotification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new(256)
    }
}

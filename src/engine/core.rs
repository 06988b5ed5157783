// src/engine/core.rs

//! Pure core admission state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`EngineEvent`]s and produces:
//! - an updated core state (running set + FIFO pending queue)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for
//! reading events from channels, folding them into the job registry, and
//! dispatching processes through the executor backend.
//!
//! The core enforces the bounded worker pool: at most `slots` jobs run
//! concurrently; overflow jobs wait in submission order.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::compiler::InvocationPlan;
use crate::engine::{EngineEvent, RuntimeOptions};
use crate::registry::JobId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start these jobs' external processes.
    Dispatch(Vec<(JobId, InvocationPlan)>),
    /// Ask the executor to terminate a running job's process.
    CancelProcess(JobId),
    /// Mark a job failed without it ever having run (e.g. cancelled while
    /// still waiting for a slot).
    FailJob { id: JobId, message: String },
    /// Request that the runtime exits (used when idle in one-shot mode).
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Pure admission pool state. No channels, no Tokio types, no IO.
#[derive(Debug)]
pub struct EngineCore {
    slots: usize,
    running: HashSet<JobId>,
    pending: VecDeque<(JobId, InvocationPlan)>,
    options: RuntimeOptions,
}

impl EngineCore {
    pub fn new(slots: usize, options: RuntimeOptions) -> Self {
        Self {
            slots: slots.max(1),
            running: HashSet::new(),
            pending: VecDeque::new(),
            options,
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        match event {
            EngineEvent::JobQueued { id, plan } => self.handle_queued(id, plan),

            // Progress only affects registry state, which the shell folds
            // before stepping the core.
            EngineEvent::JobProgress { .. } => CoreStep::running(Vec::new()),

            EngineEvent::JobCompleted { id, .. } | EngineEvent::JobFailed { id, .. } => {
                self.handle_terminal(id)
            }

            EngineEvent::CancelRequested { id } => self.handle_cancel(id),

            EngineEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn handle_queued(&mut self, id: JobId, plan: InvocationPlan) -> CoreStep {
        if self.running.len() < self.slots {
            self.running.insert(id.clone());
            debug!(job = %id, running = self.running.len(), "slot free; dispatching job");
            CoreStep::running(vec![CoreCommand::Dispatch(vec![(id, plan)])])
        } else {
            debug!(job = %id, pending = self.pending.len() + 1, "all slots busy; job waits");
            self.pending.push_back((id, plan));
            CoreStep::running(Vec::new())
        }
    }

    fn handle_terminal(&mut self, id: JobId) -> CoreStep {
        self.running.remove(&id);

        let mut commands = Vec::new();
        let admitted = self.admit_pending();
        if !admitted.is_empty() {
            commands.push(CoreCommand::Dispatch(admitted));
        }

        let mut keep_running = true;
        if self.options.exit_when_idle && self.is_idle() {
            keep_running = false;
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running,
        }
    }

    fn handle_cancel(&mut self, id: JobId) -> CoreStep {
        // Still waiting for a slot: never dispatched, fail it directly.
        if let Some(pos) = self.pending.iter().position(|(pending, _)| *pending == id) {
            self.pending.remove(pos);
            debug!(job = %id, "cancelled while pending");
            return CoreStep::running(vec![CoreCommand::FailJob {
                id,
                message: "cancelled".to_string(),
            }]);
        }

        if self.running.contains(&id) {
            // The runner synthesizes the terminal event; the slot frees when
            // it arrives.
            return CoreStep::running(vec![CoreCommand::CancelProcess(id)]);
        }

        // Unknown or already terminal: late cancels are no-ops.
        debug!(job = %id, "cancel for unknown or finished job; ignoring");
        CoreStep::running(Vec::new())
    }

    /// Move pending jobs into free slots, FIFO.
    fn admit_pending(&mut self) -> Vec<(JobId, InvocationPlan)> {
        let mut admitted = Vec::new();
        while self.running.len() < self.slots {
            let Some((id, plan)) = self.pending.pop_front() else {
                break;
            };
            self.running.insert(id.clone());
            debug!(job = %id, "admitting pending job");
            admitted.push((id, plan));
        }
        admitted
    }
}

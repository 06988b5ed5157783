// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cli::{CliArgs, CliCommand};
use crate::compiler::CommandCompiler;
use crate::config::ResolvedConfig;
use crate::engine::{EngineCore, EngineEvent, Runtime, RuntimeOptions};
use crate::errors::{EngineError, Result};
use crate::exec::RealExecutorBackend;
use crate::notify::{JobNotification, NotificationBridge, NotificationPayload};
use crate::probe::MediaInfo;
use crate::registry::{Job, JobId, JobRegistry, JobStatus};

/// One operation submission: name plus raw parameter object, as produced by
/// a caller or the upstream natural-language classifier.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Caller-supplied id for correlation; generated when `None`.
    pub job_id: Option<JobId>,
    pub operation: String,
    pub params: serde_json::Value,
    /// Human-readable description; defaults to the operation name.
    pub label: Option<String>,
}

/// Handle to a running job engine.
///
/// `start` wires together the registry, notification bridge, admission core
/// and real executor backend, and spawns the runtime loop. Submission is
/// non-blocking and returns the job id immediately; job state is read back
/// through the accessors.
pub struct Engine {
    registry: Arc<JobRegistry>,
    notifier: NotificationBridge,
    event_tx: mpsc::Sender<EngineEvent>,
    compiler: CommandCompiler,
    output_dir: PathBuf,
    ffprobe: PathBuf,
}

impl Engine {
    pub fn start(
        config: &ResolvedConfig,
        options: RuntimeOptions,
    ) -> (Self, JoinHandle<Result<()>>) {
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);
        let registry = Arc::new(JobRegistry::new());
        let notifier = NotificationBridge::default();

        let executor = RealExecutorBackend::new(event_tx.clone());
        let core = EngineCore::new(config.max_concurrent_jobs, options);
        let runtime = Runtime::new(
            core,
            Arc::clone(&registry),
            notifier.clone(),
            event_rx,
            executor,
        );
        let handle = tokio::spawn(runtime.run());

        let engine = Self {
            registry,
            notifier,
            event_tx,
            compiler: CommandCompiler::new(config.ffmpeg.clone()),
            output_dir: config.output_dir.clone(),
            ffprobe: config.ffprobe.clone(),
        };

        (engine, handle)
    }

    /// Validate, compile and enqueue an operation request.
    ///
    /// Validation failures and duplicate caller-supplied ids are returned
    /// synchronously and create no job; an accepted job is `queued` from
    /// this point on and will be picked up as soon as a worker slot frees.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobId> {
        let descriptor = catalog::classify(&request.operation, request.params)?;

        let plan = self.compiler.compile(&descriptor, &self.output_dir);
        let label = request.label.unwrap_or_else(|| request.operation.clone());
        let id = self.registry.create(
            request.job_id,
            descriptor.kind(),
            label,
            descriptor.input().to_path_buf(),
        )?;

        self.event_tx
            .send(EngineEvent::JobQueued {
                id: id.clone(),
                plan,
            })
            .await
            .map_err(|_| EngineError::EngineClosed)?;

        Ok(id)
    }

    /// Request cancellation of a queued or running job. Late cancels of
    /// terminal jobs are no-ops; ids the registry has never seen are an
    /// error.
    pub async fn cancel(&self, id: &JobId) -> Result<()> {
        if !self.registry.contains(id) {
            return Err(EngineError::JobNotFound(id.clone()));
        }
        self.event_tx
            .send(EngineEvent::CancelRequested { id: id.clone() })
            .await
            .map_err(|_| EngineError::EngineClosed)
    }

    /// Request a graceful runtime shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.event_tx
            .send(EngineEvent::ShutdownRequested)
            .await
            .map_err(|_| EngineError::EngineClosed)
    }

    /// Register an observer for job state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<JobNotification> {
        self.notifier.subscribe()
    }

    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.registry.get(id)
    }

    /// Snapshot of all jobs, newest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.registry.list()
    }

    pub fn remove_job(&self, id: &JobId) -> bool {
        self.registry.remove(id)
    }

    /// Drop all jobs in a terminal state; returns how many were removed.
    pub fn clear_terminal(&self) -> usize {
        self.registry.clear_terminal()
    }

    /// Probe a media file for container/stream metadata.
    pub async fn probe(&self, file: &Path) -> Result<MediaInfo> {
        probe::probe_file(&self.ffprobe, file).await
    }
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = config::load_and_resolve(&args.config)?;

    match args.command {
        CliCommand::Probe { file } => {
            let info = probe::probe_file(&config.ffprobe, &file).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        CliCommand::Submit {
            operation,
            params,
            label,
            job_id,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("parsing --params as JSON")?;

            run_single_job(
                &config,
                SubmitRequest {
                    job_id: job_id.map(JobId::from),
                    operation,
                    params,
                    label,
                },
            )
            .await
        }
    }
}

/// Run one submitted job to completion, logging progress as it arrives.
async fn run_single_job(config: &ResolvedConfig, request: SubmitRequest) -> anyhow::Result<()> {
    let (engine, runtime_handle) = Engine::start(
        config,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    // Ctrl-C → graceful shutdown.
    {
        let tx = engine.event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(EngineEvent::ShutdownRequested).await;
        });
    }

    // Subscribe before submitting so no notification is missed.
    let mut notifications = engine.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            if let NotificationPayload::Progress { percent, timemark } = &notification.payload {
                info!(job = %notification.job_id, percent, timemark, "progress");
            }
        }
    });

    let id = engine.submit(request).await?;
    info!(job = %id, "job accepted");

    runtime_handle.await??;
    printer.abort();

    let job = engine
        .job(&id)
        .ok_or_else(|| anyhow::anyhow!("job {id} disappeared from registry"))?;

    match job.status {
        JobStatus::Done => {
            let output = job
                .output_path
                .ok_or_else(|| anyhow::anyhow!("done job without an output path"))?;
            println!("{}", output.display());
            Ok(())
        }
        JobStatus::Error => {
            let message = job.error.unwrap_or_else(|| "transcoding failed".to_string());
            anyhow::bail!("job failed: {message}")
        }
        // exit_when_idle guarantees a terminal state unless we were
        // interrupted mid-run.
        other => anyhow::bail!("runtime stopped with job in state {other:?}"),
    }
}

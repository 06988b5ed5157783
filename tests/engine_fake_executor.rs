// tests/engine_fake_executor.rs
//
// Runtime loop behaviour with executor fakes: admission, FIFO overflow,
// cancellation and notification fan-out, all without spawning processes.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, timeout};

use mediaforge::catalog::OperationKind;
use mediaforge::engine::{EngineCore, EngineEvent, Runtime, RuntimeOptions};
use mediaforge::notify::{NotificationBridge, NotificationPayload};
use mediaforge::registry::{JobId, JobRegistry, JobStatus};
use mediaforge_test_utils::builders::PlanBuilder;
use mediaforge_test_utils::fake_executor::{FakeExecutor, HoldingExecutor};
use mediaforge_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

/// Register a job named `name` and return its queue event.
fn queued(registry: &JobRegistry, name: &str) -> EngineEvent {
    let id = registry
        .create(
            Some(JobId::from(name)),
            OperationKind::Convert,
            name,
            PathBuf::from("in.mp4"),
        )
        .expect("fresh job id");
    let plan = PlanBuilder::shell("true")
        .output(format!("/out/{name}.mp4"))
        .build();
    EngineEvent::JobQueued { id, plan }
}

fn completed(name: &str) -> EngineEvent {
    EngineEvent::JobCompleted {
        id: JobId::from(name),
        output_path: PathBuf::from(format!("/out/{name}.mp4")),
    }
}

#[tokio::test]
async fn runtime_with_fake_executor_completes_job() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();
    let mut notifications = notifier.subscribe();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched));

    tx.send(queued(&registry, "job-1")).await?;

    let core = EngineCore::new(1, RuntimeOptions { exit_when_idle: true });
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier.clone(), rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    assert_eq!(dispatched.lock().unwrap().clone(), vec![JobId::from("job-1")]);

    let job = registry.get(&JobId::from("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert_eq!(job.output_path, Some(PathBuf::from("/out/job-1.mp4")));

    // Observers saw progress strictly before the terminal notification.
    let first = notifications.try_recv()?;
    assert!(matches!(
        first.payload,
        NotificationPayload::Progress { percent: 42, .. }
    ));
    let second = notifications.try_recv()?;
    assert!(matches!(second.payload, NotificationPayload::Completed { .. }));
    assert!(notifications.try_recv().is_err());

    Ok(())
}

#[tokio::test]
async fn failed_job_keeps_its_diagnostic() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();
    let mut notifications = notifier.subscribe();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor =
        FakeExecutor::new(tx.clone(), Arc::clone(&dispatched)).failing(JobId::from("job-1"));

    tx.send(queued(&registry, "job-1")).await?;

    let core = EngineCore::new(1, RuntimeOptions { exit_when_idle: true });
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier.clone(), rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    let job = registry.get(&JobId::from("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("simulated failure"));
    assert_eq!(job.output_path, None);

    let first = notifications.try_recv()?;
    assert!(matches!(
        first.payload,
        NotificationPayload::Progress { .. }
    ));
    let second = notifications.try_recv()?;
    assert!(matches!(
        second.payload,
        NotificationPayload::Failed { message } if message == "simulated failure"
    ));

    Ok(())
}

#[tokio::test]
async fn overflow_jobs_wait_for_a_free_slot() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let cancelled = Arc::new(Mutex::new(Vec::new()));
    let executor = HoldingExecutor::new(tx.clone(), Arc::clone(&dispatched), Arc::clone(&cancelled));

    tx.send(queued(&registry, "job-a")).await?;
    tx.send(queued(&registry, "job-b")).await?;
    tx.send(EngineEvent::ShutdownRequested).await?;

    let core = EngineCore::new(1, RuntimeOptions::default());
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier, rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    // Only the first job got a slot; the second never reached the executor.
    assert_eq!(dispatched.lock().unwrap().clone(), vec![JobId::from("job-a")]);
    assert_eq!(
        registry.get(&JobId::from("job-a")).unwrap().status,
        JobStatus::Running
    );
    assert_eq!(
        registry.get(&JobId::from("job-b")).unwrap().status,
        JobStatus::Queued
    );

    Ok(())
}

#[tokio::test]
async fn pending_jobs_are_admitted_in_submission_order() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let cancelled = Arc::new(Mutex::new(Vec::new()));
    let executor = HoldingExecutor::new(tx.clone(), Arc::clone(&dispatched), Arc::clone(&cancelled));

    for name in ["job-a", "job-b", "job-c"] {
        tx.send(queued(&registry, name)).await?;
    }
    for name in ["job-a", "job-b", "job-c"] {
        tx.send(completed(name)).await?;
    }

    let core = EngineCore::new(1, RuntimeOptions { exit_when_idle: true });
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier, rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    assert_eq!(
        dispatched.lock().unwrap().clone(),
        vec![
            JobId::from("job-a"),
            JobId::from("job-b"),
            JobId::from("job-c")
        ]
    );
    for name in ["job-a", "job-b", "job-c"] {
        assert_eq!(
            registry.get(&JobId::from(name)).unwrap().status,
            JobStatus::Done
        );
    }

    Ok(())
}

#[tokio::test]
async fn cancelling_a_pending_job_never_dispatches_it() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();
    let mut notifications = notifier.subscribe();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let cancelled = Arc::new(Mutex::new(Vec::new()));
    let executor = HoldingExecutor::new(tx.clone(), Arc::clone(&dispatched), Arc::clone(&cancelled));

    tx.send(queued(&registry, "job-a")).await?;
    tx.send(queued(&registry, "job-b")).await?;
    tx.send(EngineEvent::CancelRequested {
        id: JobId::from("job-b"),
    })
    .await?;
    tx.send(completed("job-a")).await?;

    let core = EngineCore::new(1, RuntimeOptions { exit_when_idle: true });
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier.clone(), rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    assert_eq!(dispatched.lock().unwrap().clone(), vec![JobId::from("job-a")]);
    assert!(cancelled.lock().unwrap().is_empty());

    let job = registry.get(&JobId::from("job-b")).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("cancelled"));

    // The failed notification went out even though no process ever ran.
    let mut saw_cancelled = false;
    while let Ok(notification) = notifications.try_recv() {
        if notification.job_id == JobId::from("job-b") {
            assert!(matches!(
                notification.payload,
                NotificationPayload::Failed { ref message } if message == "cancelled"
            ));
            saw_cancelled = true;
        }
    }
    assert!(saw_cancelled);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_running_job_reaches_the_executor() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let cancelled = Arc::new(Mutex::new(Vec::new()));
    let executor = HoldingExecutor::new(tx.clone(), Arc::clone(&dispatched), Arc::clone(&cancelled));

    tx.send(queued(&registry, "job-a")).await?;
    tx.send(EngineEvent::CancelRequested {
        id: JobId::from("job-a"),
    })
    .await?;

    let core = EngineCore::new(1, RuntimeOptions { exit_when_idle: true });
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier, rx, executor);
    timeout(Duration::from_secs(3), runtime.run()).await??;

    assert_eq!(cancelled.lock().unwrap().clone(), vec![JobId::from("job-a")]);

    let job = registry.get(&JobId::from("job-a")).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("cancelled"));

    Ok(())
}

#[tokio::test]
async fn late_events_after_terminal_are_not_forwarded() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let registry = Arc::new(JobRegistry::new());
    let notifier = NotificationBridge::default();
    let mut notifications = notifier.subscribe();

    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched));

    let core = EngineCore::new(1, RuntimeOptions::default());
    let runtime = Runtime::new(core, Arc::clone(&registry), notifier.clone(), rx, executor);
    let handle = tokio::spawn(runtime.run());

    tx.send(queued(&registry, "job-1")).await?;

    // Wait for the terminal notification before injecting the stale event.
    let first = with_timeout(notifications.recv()).await?;
    assert!(matches!(
        first.payload,
        NotificationPayload::Progress { .. }
    ));
    let second = with_timeout(notifications.recv()).await?;
    assert!(matches!(second.payload, NotificationPayload::Completed { .. }));

    tx.send(EngineEvent::JobProgress {
        id: JobId::from("job-1"),
        percent: 99,
        timemark: "00:00:09.00".to_string(),
    })
    .await?;
    tx.send(EngineEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    // The stale progress was dropped by the registry and never published.
    assert!(matches!(
        notifications.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    let job = registry.get(&JobId::from("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);

    Ok(())
}

// tests/property_admission.rs

use std::path::PathBuf;

use proptest::prelude::*;

use mediaforge::engine::{CoreCommand, EngineCore, EngineEvent, RuntimeOptions};
use mediaforge::exec::ProgressParser;
use mediaforge::registry::JobId;
use mediaforge_test_utils::builders::PlanBuilder;

fn job_id(i: usize) -> JobId {
    JobId::from(format!("job-{i}"))
}

/// Collect the ids a step dispatched, in order.
fn dispatched_ids(commands: &[CoreCommand]) -> Vec<JobId> {
    commands
        .iter()
        .flat_map(|command| match command {
            CoreCommand::Dispatch(jobs) => jobs.iter().map(|(id, _)| id.clone()).collect(),
            _ => Vec::new(),
        })
        .collect()
}

proptest! {
    /// However jobs are queued and completed, the pool never runs more than
    /// `slots` jobs at once, and dispatch order matches submission order.
    #[test]
    fn admission_pool_respects_slots_and_fifo(
        slots in 1usize..4,
        n_jobs in 1usize..20,
    ) {
        let mut core = EngineCore::new(slots, RuntimeOptions::default());
        let mut dispatched = Vec::new();

        for i in 0..n_jobs {
            let step = core.step(EngineEvent::JobQueued {
                id: job_id(i),
                plan: PlanBuilder::shell("true").build(),
            });
            dispatched.extend(dispatched_ids(&step.commands));
            prop_assert!(core.running_count() <= slots);
        }
        prop_assert_eq!(dispatched.len(), slots.min(n_jobs));

        // Complete jobs in dispatch order; each completion admits at most
        // one pending job.
        let mut i = 0;
        while i < dispatched.len() {
            let step = core.step(EngineEvent::JobCompleted {
                id: dispatched[i].clone(),
                output_path: PathBuf::from("out.mp4"),
            });
            dispatched.extend(dispatched_ids(&step.commands));
            prop_assert!(core.running_count() <= slots);
            i += 1;
        }

        let expected: Vec<JobId> = (0..n_jobs).map(job_id).collect();
        prop_assert_eq!(dispatched, expected);
        prop_assert!(core.is_idle());
    }

    /// Failures free slots exactly like completions do.
    #[test]
    fn failures_also_free_slots(n_jobs in 1usize..10) {
        let mut core = EngineCore::new(1, RuntimeOptions::default());
        let mut dispatched = Vec::new();

        for i in 0..n_jobs {
            let step = core.step(EngineEvent::JobQueued {
                id: job_id(i),
                plan: PlanBuilder::shell("true").build(),
            });
            dispatched.extend(dispatched_ids(&step.commands));
        }

        let mut i = 0;
        while i < dispatched.len() {
            let step = core.step(EngineEvent::JobFailed {
                id: dispatched[i].clone(),
                message: "boom".to_string(),
            });
            dispatched.extend(dispatched_ids(&step.commands));
            prop_assert!(core.running_count() <= 1);
            i += 1;
        }

        prop_assert_eq!(dispatched.len(), n_jobs);
        prop_assert!(core.is_idle());
    }

    /// Whatever the stderr stream looks like, the reported percentage stays
    /// within 0–100 and never decreases.
    #[test]
    fn progress_percent_is_monotonic(
        lines in proptest::collection::vec(
            (any::<bool>(), 0u32..3, 0u32..60, 0u32..60),
            0..40,
        ),
    ) {
        let mut parser = ProgressParser::new();
        let mut last = 0u8;

        for (is_duration, h, m, s) in lines {
            let line = if is_duration {
                format!("  Duration: {h:02}:{m:02}:{s:02}.00, start: 0.000000, bitrate: 128 kb/s")
            } else {
                format!("frame=1 fps=30 time={h:02}:{m:02}:{s:02}.00 bitrate=1.0kbits/s")
            };

            if let Some(update) = parser.push_line(&line) {
                prop_assert!(update.percent <= 100);
                prop_assert!(update.percent >= last);
                last = update.percent;
            }
        }
    }
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use mediaforge::compiler::InvocationPlan;

/// Builder for `InvocationPlan` to simplify test setup. Executor tests write
/// plans by hand instead of compiling them from a descriptor, so the child
/// process can be any shell script.
pub struct PlanBuilder {
    plan: InvocationPlan,
}

impl PlanBuilder {
    /// Plan that runs `/bin/sh -c <script>`.
    ///
    /// The default input path points at the shell binary itself, which
    /// satisfies the pre-spawn existence check; tests that care about the
    /// input override it.
    pub fn shell(script: &str) -> Self {
        Self {
            plan: InvocationPlan {
                program: PathBuf::from("/bin/sh"),
                args: vec!["-c".to_string(), script.to_string()],
                input_path: PathBuf::from("/bin/sh"),
                output_path: PathBuf::from("output.mp4"),
                incremental: true,
            },
        }
    }

    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.plan.program = program.into();
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan.input_path = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan.output_path = path.into();
        self
    }

    pub fn incremental(mut self, val: bool) -> Self {
        self.plan.incremental = val;
        self
    }

    pub fn build(self) -> InvocationPlan {
        self.plan
    }
}

/// Raw parameter object with just an input path, the minimum every
/// operation requires.
pub fn input_params(input: &Path) -> serde_json::Value {
    serde_json::json!({ "inputPath": input })
}

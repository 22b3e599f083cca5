// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`execution`] owns the task registry, the dependency graph and the
//!   dispatch loop.
//! - [`fail_action`] decides whether a failed task halts the execution.
//! - [`builder`] turns a validated configuration into registered tasks.

pub mod builder;
pub mod execution;
pub mod fail_action;

pub use builder::tasks_from_config;
pub use execution::Execution;
pub use fail_action::{ContinueExecution, FailAction, HaltDecision, StopExecution};

/// Final status of every registered task after [`Execution::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub execution: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Still queued when the execution ended.
    pub not_run: Vec<String>,
    /// Dispatch stopped because of a failure.
    pub halted: bool,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_run.is_empty()
    }
}

// src/engine/fail_action.rs

use std::fmt;

use tracing::warn;

use crate::task::Task;

/// What the engine does after a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltDecision {
    /// Stop dispatching; tasks still queued never run.
    Halt,
    /// Keep going; dependents are promoted according to the promotion policy.
    Continue,
}

/// Hook invoked once per failed task.
///
/// A task may carry its own action; otherwise the execution-wide one applies.
pub trait FailAction: Send + Sync + fmt::Debug {
    fn on_failure(&self, task: &Task) -> HaltDecision;
}

/// Halt on the first failure (default).
#[derive(Debug, Clone, Copy, Default)]
pub struct StopExecution;

impl FailAction for StopExecution {
    fn on_failure(&self, _task: &Task) -> HaltDecision {
        HaltDecision::Halt
    }
}

/// Log the failure and keep scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueExecution;

impl FailAction for ContinueExecution {
    fn on_failure(&self, task: &Task) -> HaltDecision {
        warn!(
            task = %task.name(),
            error = task.error().unwrap_or("unknown"),
            "task failed; continuing execution"
        );
        HaltDecision::Continue
    }
}

// src/report.rs

//! Progress reporting sink handed to the engine and to every task.
//!
//! The engine never talks to a global logger for progress; it reports through
//! a [`Reporter`]. [`TracingReporter`] forwards everything to `tracing`, tests
//! can plug in a recording implementation.

use tracing::{error, info, warn};

use crate::types::TaskStatus;

/// Marker inserted between the head and the tail of a trimmed output block.
pub const ELISION: &str = "... ...";

/// Sink for execution progress.
pub trait Reporter: Send + Sync {
    /// A task was dispatched.
    fn task_started(&self, task: &str, kind: &str);

    /// Free-form progress line from inside a task (e.g. "building image").
    fn task_progress(&self, task: &str, message: &str);

    /// A task finished; `stdout`/`stderr` are the full captured buffers.
    fn task_finished(&self, task: &str, status: TaskStatus, stdout: &[String], stderr: &[String]);

    /// Scheduling stopped.
    fn execution_halted(&self, execution: &str, reason: &str);
}

/// Default reporter: structured `tracing` events with output trimmed to a
/// head/tail window.
#[derive(Debug, Clone)]
pub struct TracingReporter {
    window: usize,
}

impl TracingReporter {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Reporter for TracingReporter {
    fn task_started(&self, task: &str, kind: &str) {
        info!(task = %task, kind = %kind, "starting task");
    }

    fn task_progress(&self, task: &str, message: &str) {
        info!(task = %task, "{message}");
    }

    fn task_finished(&self, task: &str, status: TaskStatus, stdout: &[String], stderr: &[String]) {
        for line in trim_lines(stdout, self.window) {
            info!(task = %task, "out: {line}");
        }
        match status {
            TaskStatus::Failed => {
                for line in trim_lines(stderr, self.window) {
                    error!(task = %task, "err: {line}");
                }
                error!(task = %task, "task failed");
            }
            _ => {
                for line in trim_lines(stderr, self.window) {
                    warn!(task = %task, "err: {line}");
                }
                info!(task = %task, %status, "task finished");
            }
        }
    }

    fn execution_halted(&self, execution: &str, reason: &str) {
        info!(execution = %execution, "execution halted: {reason}");
    }
}

/// Keep the first and last `window / 2` lines of `lines`, joined by
/// [`ELISION`]. The window never drops below 5.
pub fn trim_lines(lines: &[String], window: usize) -> Vec<String> {
    let window = window.max(5);
    if lines.len() <= window {
        return lines.to_vec();
    }

    let half = window / 2;
    let mut out = Vec::with_capacity(half * 2 + 1);
    out.extend_from_slice(&lines[..half]);
    out.push(ELISION.to_string());
    out.extend_from_slice(&lines[lines.len() - half..]);
    out
}

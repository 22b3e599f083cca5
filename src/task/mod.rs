// src/task/mod.rs

//! Units of work scheduled by the engine.
//!
//! - [`image`]: build a container image from a generated build context.
//! - [`containers`]: launch a group of containers from one image.
//! - [`exec`]: run commands inside a group's containers and verify output.
//! - [`template`] and [`expect`] hold the `${id}` helpers and the output
//!   matcher the kinds share.

pub mod containers;
pub mod exec;
pub mod expect;
pub mod image;
pub mod template;

use std::error::Error as _;
use std::path::Path;

use tracing::debug;

use crate::engine::FailAction;
use crate::errors::RigError;
use crate::exec::{Backend, CommandOutput};
use crate::report::Reporter;
use crate::types::TaskStatus;

pub use containers::ContainerGroupTask;
pub use exec::ContainerExecTask;
pub use image::{GeneratedFile, ImageBuildTask, ImageSpec};

/// Shared, read-only environment a task runs in.
pub struct TaskContext<'a> {
    pub backend: &'a dyn Backend,
    pub reporter: &'a dyn Reporter,
    /// Execution working directory; tasks write below it.
    pub workdir: &'a Path,
}

/// Captured output lines of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl TaskOutput {
    pub fn push_out(&mut self, line: impl Into<String>) {
        self.stdout.push(line.into());
    }

    pub fn push_err(&mut self, line: impl Into<String>) {
        self.stderr.push(line.into());
    }

    /// Append both streams of a finished engine command.
    pub fn extend(&mut self, output: &CommandOutput) {
        self.stdout.extend(output.stdout.iter().cloned());
        self.stderr.extend(output.stderr.iter().cloned());
    }
}

/// What a task does when dispatched.
#[derive(Debug)]
pub enum TaskKind {
    Image(ImageBuildTask),
    Containers(ContainerGroupTask),
    Exec(ContainerExecTask),
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Image(_) => "image",
            TaskKind::Containers(_) => "containers",
            TaskKind::Exec(_) => "exec",
        }
    }
}

/// A named node of the execution DAG.
#[derive(Debug)]
pub struct Task {
    name: String,
    depends: Vec<String>,
    status: TaskStatus,
    output: TaskOutput,
    error: Option<String>,
    fail_action: Option<Box<dyn FailAction>>,
    kind: TaskKind,
}

impl Task {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
            status: TaskStatus::Queued,
            output: TaskOutput::default(),
            error: None,
            fail_action: None,
            kind,
        }
    }

    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in depends {
            self.add_depend(dep.into());
        }
        self
    }

    /// Override the execution's fail-action for this task only.
    pub fn with_fail_action(mut self, fail_action: Box<dyn FailAction>) -> Self {
        self.fail_action = Some(fail_action);
        self
    }

    pub fn fail_action(&self) -> Option<&dyn FailAction> {
        self.fail_action.as_deref()
    }

    /// Record `dep` as a dependency name; duplicates are ignored.
    pub(crate) fn add_depend(&mut self, dep: String) {
        if !self.depends.contains(&dep) {
            self.depends.push(dep);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depends(&self) -> &[String] {
        &self.depends
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn output(&self) -> &TaskOutput {
        &self.output
    }

    /// Error that failed the task, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn as_containers(&self) -> Option<&ContainerGroupTask> {
        match &self.kind {
            TaskKind::Containers(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_containers_mut(&mut self) -> Option<&mut ContainerGroupTask> {
        match &mut self.kind {
            TaskKind::Containers(group) => Some(group),
            _ => None,
        }
    }

    /// Run the task once: `Queued -> Running -> {Succeeded, Failed}`.
    ///
    /// Errors never escape; they fail the task and their cause chain is
    /// appended to stderr.
    pub async fn run(&mut self, ctx: &TaskContext<'_>) -> TaskStatus {
        if self.status != TaskStatus::Queued {
            debug!(task = %self.name, status = %self.status, "task already dispatched; skipping");
            return self.status;
        }
        self.status = TaskStatus::Running;

        let name = self.name.as_str();
        let out = &mut self.output;
        let result = match &mut self.kind {
            TaskKind::Image(task) => task.run(name, ctx, out).await,
            TaskKind::Containers(task) => task.run(name, ctx, out).await,
            TaskKind::Exec(task) => task.run(name, ctx, out).await,
        };

        self.status = match result {
            Ok(()) => TaskStatus::Succeeded,
            Err(err) => {
                self.output.stderr.extend(error_trace(&err));
                self.error = Some(err.to_string());
                TaskStatus::Failed
            }
        };
        self.status
    }
}

/// `err` followed by its `source()` chain, one line each.
fn error_trace(err: &RigError) -> Vec<String> {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depends_are_deduplicated() {
        let task = Task::new(
            "t",
            TaskKind::Exec(ContainerExecTask::from_targets("g", vec![], vec![], vec![]).unwrap()),
        )
        .with_depends(["a", "b", "a"]);
        assert_eq!(task.depends(), ["a", "b"]);
        assert_eq!(task.status(), TaskStatus::Queued);
    }

    #[test]
    fn trace_lists_the_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RigError::Other(anyhow::Error::new(io).context("reading script"));
        let trace = error_trace(&err);
        assert_eq!(trace[0], "reading script");
        assert_eq!(trace[1], "caused by: gone");
    }
}

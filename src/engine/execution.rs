// src/engine/execution.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ExecutionReport;
use super::fail_action::{FailAction, HaltDecision, StopExecution};
use crate::dag::{Scheduler, TaskGraph};
use crate::errors::{Result, RigError};
use crate::exec::Backend;
use crate::report::{Reporter, TracingReporter};
use crate::task::{Task, TaskContext};
use crate::types::{PromotionPolicy, TaskStatus};

/// Registry of tasks plus the loop that runs them in dependency order.
///
/// Tasks are registered before [`Execution::run`]; a task may only depend on
/// tasks registered before it, and later edges are checked for cycles. `run`
/// dispatches one task at a time from a FIFO ready queue.
pub struct Execution<B: Backend> {
    name: String,
    backend: B,
    workdir: PathBuf,
    reporter: Box<dyn Reporter>,
    fail_action: Box<dyn FailAction>,
    policy: PromotionPolicy,
    graph: TaskGraph,
    tasks: Vec<Task>,
    started: bool,
    halted: bool,
}

impl<B: Backend> fmt::Debug for Execution<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("name", &self.name)
            .field("workdir", &self.workdir)
            .field("policy", &self.policy)
            .field("tasks", &self.tasks)
            .field("started", &self.started)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Execution<B> {
    pub fn new(name: impl Into<String>, backend: B, workdir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            backend,
            workdir: workdir.into(),
            reporter: Box::new(TracingReporter::default()),
            fail_action: Box::new(StopExecution),
            policy: PromotionPolicy::default(),
            graph: TaskGraph::new(),
            tasks: Vec::new(),
            started: false,
            halted: false,
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_fail_action(mut self, fail_action: Box<dyn FailAction>) -> Self {
        self.fail_action = fail_action;
        self
    }

    pub fn with_promotion(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.graph.index_of(name).map(|i| &self.tasks[i])
    }

    pub fn task_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.graph.index_of(name).map(|i| &mut self.tasks[i])
    }

    fn ensure_not_started(&self, what: &str) -> Result<()> {
        if self.started {
            return Err(RigError::config(format!(
                "cannot {what}: execution '{}' has already started",
                self.name
            )));
        }
        Ok(())
    }

    /// Register `task` with edges to its declared dependencies, which must
    /// already be registered.
    pub fn add_task(&mut self, task: Task) -> Result<usize> {
        self.ensure_not_started("add tasks")?;

        let mut deps = Vec::with_capacity(task.depends().len());
        for dep in task.depends() {
            let idx = self.graph.index_of(dep).ok_or_else(|| {
                RigError::config(format!(
                    "task '{}' depends on '{dep}', which is not declared before it",
                    task.name()
                ))
            })?;
            deps.push(idx);
        }

        let idx = self.graph.add_node(task.name())?;
        for dep in deps {
            self.graph.add_dependency(idx, dep)?;
        }
        debug!(task = %task.name(), kind = task.kind().label(), "registered task");
        self.tasks.push(task);
        Ok(idx)
    }

    /// Add an edge between two registered tasks.
    pub fn add_dependency(&mut self, task: &str, dep: &str) -> Result<()> {
        self.ensure_not_started("add dependencies")?;

        let lookup = |name: &str| {
            self.graph
                .index_of(name)
                .ok_or_else(|| RigError::config(format!("unknown task '{name}'")))
        };
        let task_idx = lookup(task)?;
        let dep_idx = lookup(dep)?;

        self.graph.add_dependency(task_idx, dep_idx)?;
        self.tasks[task_idx].add_depend(dep.to_string());
        Ok(())
    }

    fn prepare_workdir(&self) -> Result<()> {
        if self.workdir.exists() {
            debug!(workdir = %self.workdir.display(), "clearing previous working directory");
            fs::remove_dir_all(&self.workdir)?;
        }
        fs::create_dir_all(&self.workdir)?;
        Ok(())
    }

    /// Run every reachable task once.
    ///
    /// Returns `Ok` with a report even when tasks fail; `Err` means the
    /// execution could not start (already run, or the working directory
    /// could not be prepared).
    pub async fn run(&mut self) -> Result<ExecutionReport> {
        self.ensure_not_started("run")?;
        self.started = true;
        self.prepare_workdir()?;

        info!(
            execution = %self.name,
            tasks = self.tasks.len(),
            workdir = %self.workdir.display(),
            "starting execution"
        );

        let mut scheduler = Scheduler::seed(&self.graph, self.policy);

        while let Some(idx) = scheduler.next() {
            if self.halted {
                break;
            }

            let task = &mut self.tasks[idx];
            self.reporter.task_started(task.name(), task.kind().label());

            let ctx = TaskContext {
                backend: &self.backend,
                reporter: self.reporter.as_ref(),
                workdir: &self.workdir,
            };
            let status = task.run(&ctx).await;

            let output = task.output();
            self.reporter
                .task_finished(task.name(), status, &output.stdout, &output.stderr);

            let task: &Task = task;
            let fail_action = task.fail_action().unwrap_or(self.fail_action.as_ref());
            if status == TaskStatus::Failed && fail_action.on_failure(task) == HaltDecision::Halt {
                self.halted = true;
                let reason = format!(
                    "task '{}' failed: {}",
                    task.name(),
                    task.error().unwrap_or("unknown error")
                );
                self.reporter.execution_halted(&self.name, &reason);
                break;
            }

            let tasks = &self.tasks;
            scheduler.complete(&self.graph, idx, |i| tasks[i].status());
        }

        let report = self.report();
        info!(
            execution = %self.name,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            not_run = report.not_run.len(),
            halted = report.halted,
            "execution finished"
        );
        Ok(report)
    }

    /// Summary of task statuses, in registration order.
    pub fn report(&self) -> ExecutionReport {
        let mut report = ExecutionReport {
            execution: self.name.clone(),
            halted: self.halted,
            ..ExecutionReport::default()
        };
        for task in &self.tasks {
            let name = task.name().to_string();
            match task.status() {
                TaskStatus::Succeeded => report.succeeded.push(name),
                TaskStatus::Failed => report.failed.push(name),
                TaskStatus::Queued | TaskStatus::Running => report.not_run.push(name),
            }
        }
        report
    }
}

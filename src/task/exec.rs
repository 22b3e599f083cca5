// src/task/exec.rs

use regex::Regex;

use super::containers::ContainerGroupTask;
use super::expect::first_unmatched;
use super::template::substitute;
use super::{TaskContext, TaskOutput};
use crate::errors::{Result, RigError};
use crate::exec::command::{exec_args, render_args};
use crate::report::trim_lines;

/// Lines of combined output shown in a verification error.
pub const FAILURE_VIEW_LINES: usize = 20;

/// Runs commands inside some or all containers of a group, then checks the
/// combined output of each container against ordered expectations.
///
/// Commands and expectations are `${id}` templates. Exit codes are recorded
/// but do not fail the task; only unmet expectations do.
#[derive(Debug, Clone)]
pub struct ContainerExecTask {
    group: String,
    /// `(instance id, container name)` for each targeted instance.
    targets: Vec<(u32, String)>,
    commands: Vec<String>,
    expectations: Vec<String>,
}

impl ContainerExecTask {
    /// Target `ids` of `group` (all of its instances when `None`).
    pub fn new(
        group_name: &str,
        group: &ContainerGroupTask,
        ids: Option<Vec<u32>>,
        commands: Vec<String>,
        expectations: Vec<String>,
    ) -> Result<Self> {
        let ids = ids.unwrap_or_else(|| group.ids().to_vec());
        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            let container = group.container_for(id).ok_or_else(|| {
                RigError::config(format!(
                    "id {id} is not an instance of containers '{group_name}' (ids {:?})",
                    group.ids()
                ))
            })?;
            targets.push((id, container.to_string()));
        }
        Self::from_targets(group_name, targets, commands, expectations)
    }

    /// Build from explicit targets. Every command must tokenize and every
    /// expectation must compile for every target id.
    pub fn from_targets(
        group_name: &str,
        targets: Vec<(u32, String)>,
        commands: Vec<String>,
        expectations: Vec<String>,
    ) -> Result<Self> {
        for (id, _) in &targets {
            for command in &commands {
                tokenize(&substitute(command, *id))?;
            }
            compile(&expectations, *id)?;
        }
        Ok(Self {
            group: group_name.to_string(),
            targets,
            commands,
            expectations,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn targets(&self) -> &[(u32, String)] {
        &self.targets
    }

    pub(crate) async fn run(
        &mut self,
        task: &str,
        ctx: &TaskContext<'_>,
        out: &mut TaskOutput,
    ) -> Result<()> {
        for (id, container) in &self.targets {
            let mut combined = Vec::new();

            for command in &self.commands {
                let argv = tokenize(&substitute(command, *id))?;
                ctx.reporter
                    .task_progress(task, &format!("{container}: {}", argv.join(" ")));
                out.push_out(format!("$ {}", render_args(&exec_args(container, &argv))));

                let result = ctx.backend.exec(container, &argv).await?;
                out.extend(&result);
                if !result.is_success() {
                    out.push_err(format!(
                        "{container}: '{}' exited with {}",
                        argv.join(" "),
                        result.exit_code
                    ));
                }
                combined.extend(result.stdout);
                combined.extend(result.stderr);
            }

            let expectations = compile(&self.expectations, *id)?;
            if let Some(missed) = first_unmatched(&combined, &expectations) {
                let view = trim_lines(&combined, FAILURE_VIEW_LINES).join("\n");
                return Err(RigError::VerificationFailure(format!(
                    "{container} (id {id}): no output line matched '{}' in order; output was:\n{view}",
                    expectations[missed].as_str()
                )));
            }
        }
        Ok(())
    }
}

fn tokenize(command: &str) -> Result<Vec<String>> {
    match shlex::split(command) {
        Some(argv) if !argv.is_empty() => Ok(argv),
        _ => Err(RigError::config(format!("cannot tokenize command '{command}'"))),
    }
}

fn compile(patterns: &[String], id: u32) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let pattern = substitute(p, id);
            Regex::new(&pattern)
                .map_err(|e| RigError::config(format!("invalid expectation '{pattern}': {e}")))
        })
        .collect()
}

// src/engine/builder.rs

//! Configuration to task translation.
//!
//! A containers task implicitly depends on the image task it launches, an
//! exec task on the containers task it targets. Both references must name
//! a task of the right kind declared earlier in the file.

use std::time::Duration;

use crate::config::model::{
    ConfigFile, ContainersDescriptor, ExecDescriptor, ImageDescriptor, TaskDescriptor,
};
use crate::engine::Execution;
use crate::errors::{Result, RigError};
use crate::exec::Backend;
use crate::report::TracingReporter;
use crate::task::template::NameTemplate;
use crate::task::{
    ContainerExecTask, ContainerGroupTask, ImageBuildTask, ImageSpec, Task, TaskKind,
};

/// Image tag for an image task: `<execution>/<task>`.
pub fn image_tag(execution: &str, task: &str) -> String {
    format!("{execution}/{task}")
}

/// Build every configured task, in declaration order.
pub fn tasks_from_config(cfg: &ConfigFile) -> Result<Vec<Task>> {
    let mut tasks: Vec<Task> = Vec::with_capacity(cfg.task.len());
    for descriptor in &cfg.task {
        let task = match descriptor {
            TaskDescriptor::Image(d) => image_task(cfg, d),
            TaskDescriptor::Containers(d) => containers_task(cfg, d, &tasks)?,
            TaskDescriptor::Exec(d) => exec_task(d, &tasks)?,
        };
        tasks.push(task.with_depends(descriptor.depends()));
    }
    Ok(tasks)
}

fn image_task(cfg: &ConfigFile, d: &ImageDescriptor) -> Task {
    let mut spec = ImageSpec::new(cfg.execution.base_image.clone());
    spec.proxy = d.proxy.clone().unwrap_or_else(|| cfg.proxy.clone());
    spec.packages = d.install.clone();
    spec.volumes = d.volumes.clone();
    spec.copies = d
        .copy
        .iter()
        .map(|c| (cfg.resolve_path(&c.src), c.dst.clone()))
        .collect();

    if let Some(startup) = &d.startup {
        spec.startup_scripts = startup.scripts.clone();
        spec.startup_paths = if startup.paths.is_empty() {
            vec![cfg.base_dir.clone()]
        } else {
            startup.paths.iter().map(|p| cfg.resolve_path(p)).collect()
        };
    }

    let tag = image_tag(&cfg.execution.name, &d.name);
    Task::new(d.name.clone(), TaskKind::Image(ImageBuildTask::new(tag, spec)))
}

fn containers_task(cfg: &ConfigFile, d: &ContainersDescriptor, earlier: &[Task]) -> Result<Task> {
    let image = earlier
        .iter()
        .find(|t| t.name() == d.image)
        .ok_or_else(|| {
            RigError::config(format!(
                "containers '{}' uses image '{}', which is not declared before it",
                d.name, d.image
            ))
        })?;
    let TaskKind::Image(image) = image.kind() else {
        return Err(RigError::config(format!(
            "containers '{}': task '{}' is not an image task",
            d.name, d.image
        )));
    };

    let ids = d.ids.resolve()?;
    let names = NameTemplate::from_config(&d.name, &d.names, d.name_pattern.as_deref())?;
    let settle = d.settle_secs.unwrap_or(cfg.execution.settle_secs);

    let mut group = ContainerGroupTask::new(image.tag(), ids, &names)?
        .with_settle(Duration::from_secs(settle));
    for volume in &d.volume {
        let src = cfg.resolve_path(&volume.src).display().to_string();
        group = group.with_volume(src, volume.dst.clone());
    }
    for env in &d.env {
        group = group.with_env(env.name.clone(), env.value.clone());
    }

    Ok(Task::new(d.name.clone(), TaskKind::Containers(group)).with_depends([d.image.clone()]))
}

fn exec_task(d: &ExecDescriptor, earlier: &[Task]) -> Result<Task> {
    let group = earlier
        .iter()
        .find(|t| t.name() == d.containers)
        .and_then(Task::as_containers)
        .ok_or_else(|| {
            RigError::config(format!(
                "exec '{}' targets '{}', which is not a containers task declared before it",
                d.name, d.containers
            ))
        })?;

    let ids = d.ids.as_ref().map(|spec| spec.resolve()).transpose()?;
    let exec = ContainerExecTask::new(&d.containers, group, ids, d.run.clone(), d.expect.clone())?;

    Ok(Task::new(d.name.clone(), TaskKind::Exec(exec)).with_depends([d.containers.clone()]))
}

impl<B: Backend> Execution<B> {
    /// Execution with every configured task registered.
    pub fn from_config(cfg: &ConfigFile, backend: B) -> Result<Self> {
        let mut execution = Execution::new(cfg.execution.name.clone(), backend, cfg.workdir())
            .with_reporter(Box::new(TracingReporter::new(cfg.execution.log_window)))
            .with_promotion(cfg.execution.promotion);

        for task in tasks_from_config(cfg)? {
            execution.add_task(task)?;
        }
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;

    fn config(text: &str) -> Result<ConfigFile> {
        ConfigFile::try_from(load_from_str(text)?)
    }

    const KV: &str = r#"
[execution]
name = "kv"

[[task]]
kind = "image"
name = "server-image"

[[task]]
kind = "containers"
name = "servers"
image = "server-image"
ids = "0:3"

[[task]]
kind = "exec"
name = "check"
containers = "servers"
ids = [1]
run = ["cat /etc/hosts"]
"#;

    #[test]
    fn references_become_dependencies() {
        let tasks = tasks_from_config(&config(KV).unwrap()).unwrap();
        assert_eq!(tasks[1].depends(), ["server-image"]);
        assert_eq!(tasks[2].depends(), ["servers"]);

        let TaskKind::Image(image) = tasks[0].kind() else {
            panic!("expected an image task");
        };
        assert_eq!(image.tag(), "kv/server-image");

        let TaskKind::Exec(exec) = tasks[2].kind() else {
            panic!("expected an exec task");
        };
        assert_eq!(exec.targets(), [(1, "servers-1".to_string())]);
    }

    #[test]
    fn forward_image_reference_is_rejected() {
        let text = r#"
[execution]
name = "kv"

[[task]]
kind = "containers"
name = "servers"
image = "later"
ids = "0"

[[task]]
kind = "image"
name = "later"
"#;
        let err = tasks_from_config(&config(text).unwrap()).unwrap_err();
        assert!(matches!(err, RigError::ConfigError(_)));
    }

    #[test]
    fn exec_must_target_a_containers_task() {
        let text = r#"
[execution]
name = "kv"

[[task]]
kind = "image"
name = "img"

[[task]]
kind = "exec"
name = "check"
containers = "img"
run = ["true"]
"#;
        assert!(tasks_from_config(&config(text).unwrap()).is_err());
    }
}

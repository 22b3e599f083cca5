// tests/container_launch.rs

mod common;
use crate::common::builders::{ContainersBuilder, ExecBuilder, ImageBuilder};
use crate::common::{Call, FakeBackend, execution, init_tracing, rig, scratch};

use std::error::Error;
use std::fs;

use dockrig::types::TaskStatus;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn launch_failure_stops_the_group_and_the_execution() -> TestResult {
    init_tracing();
    let dir = scratch();
    let cfg = rig("kv", dir.path())
        .without_dns()
        .with_task(ImageBuilder::new("img").build())
        .with_task(ContainersBuilder::new("nodes", "img", "0:3").build())
        .with_task(ExecBuilder::new("check", "nodes").run("true").build())
        .build();
    let backend = FakeBackend::new().fail_run("nodes-1", 125);
    let mut exec = execution(&cfg, &backend);

    let report = exec.run().await?;
    assert!(report.halted);
    assert_eq!(report.failed, vec!["nodes"]);
    assert_eq!(report.not_run, vec!["check"]);

    assert_eq!(backend.launched_names(), vec!["nodes-0", "nodes-1"]);
    assert!(backend.execs().is_empty());

    let nodes = exec.task("nodes").unwrap();
    assert_eq!(nodes.status(), TaskStatus::Failed);
    let error = nodes.error().unwrap();
    assert!(error.starts_with("Container launch failed"), "{error}");
    assert!(error.contains("nodes-1"));
    Ok(())
}

#[tokio::test]
async fn leftovers_are_removed_and_logs_are_written() -> TestResult {
    let dir = scratch();
    let cfg = rig("kv", dir.path())
        .without_dns()
        .with_task(ImageBuilder::new("img").build())
        .with_task(ContainersBuilder::new("nodes", "img", "4,9").build())
        .build();
    let backend = FakeBackend::new();
    let mut exec = execution(&cfg, &backend);
    exec.run().await?;

    let calls = backend.calls();
    let remove = calls
        .iter()
        .position(|c| *c == Call::Remove("nodes-9".to_string()))
        .unwrap();
    let run = calls
        .iter()
        .position(|c| matches!(c, Call::Run(spec) if spec.name.as_deref() == Some("nodes-9")))
        .unwrap();
    assert!(remove < run);

    for name in ["nodes-4", "nodes-9"] {
        let log = fs::read_to_string(exec.workdir().join("containers").join(name).join("log.out"))?;
        assert_eq!(log, format!("{name} started\n"));
        assert!(exec.workdir().join("containers").join(name).join("log.err").is_file());
    }
    Ok(())
}

#[tokio::test]
async fn volumes_and_env_are_templated_per_instance() -> TestResult {
    let dir = scratch();
    for id in 0..2 {
        fs::create_dir_all(dir.path().join(format!("data/{id}")))?;
    }
    let src = format!("{}/data/${{id}}", dir.path().display());
    let cfg = rig("kv", dir.path())
        .without_dns()
        .with_task(ImageBuilder::new("img").build())
        .with_task(
            ContainersBuilder::new("nodes", "img", "0:2")
                .volume(&src, "/srv")
                .env("NODE_ID", "node-${id}")
                .build(),
        )
        .build();
    let backend = FakeBackend::new();
    execution(&cfg, &backend).run().await?;

    let launched = backend.launched();
    assert_eq!(launched[1].image, "kv/img");
    assert_eq!(
        launched[1].volumes,
        vec![format!("{}/data/1:/srv:ro", dir.path().display())]
    );
    assert_eq!(launched[1].envs, vec![("NODE_ID".to_string(), "node-1".to_string())]);
    Ok(())
}

#[tokio::test]
async fn missing_volume_source_fails_the_launch() -> TestResult {
    let dir = scratch();
    let cfg = rig("kv", dir.path())
        .without_dns()
        .with_task(ImageBuilder::new("img").build())
        .with_task(
            ContainersBuilder::new("nodes", "img", "0")
                .volume("/definitely/missing/${id}", "/srv")
                .build(),
        )
        .build();
    let backend = FakeBackend::new();
    let mut exec = execution(&cfg, &backend);
    let report = exec.run().await?;

    assert_eq!(report.failed, vec!["nodes"]);
    assert!(backend.launched().is_empty());
    assert!(exec.task("nodes").unwrap().error().unwrap().contains("/definitely/missing/0"));
    Ok(())
}

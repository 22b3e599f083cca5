// tests/exec_verification.rs

mod common;
use crate::common::builders::{ContainersBuilder, ExecBuilder, ImageBuilder};
use crate::common::{FakeBackend, execution, init_tracing, rig, scratch};

use std::error::Error;

use dockrig::config::ConfigFile;
use dockrig::report::ELISION;

type TestResult = Result<(), Box<dyn Error>>;

fn config(dir: &std::path::Path, exec: ExecBuilder) -> ConfigFile {
    rig("kv", dir)
        .without_dns()
        .with_task(ImageBuilder::new("img").build())
        .with_task(
            ContainersBuilder::new("servers", "img", "0:3")
                .name_pattern("server${id}")
                .build(),
        )
        .with_task(exec.build())
        .build()
}

#[tokio::test]
async fn ordered_expectations_pass() -> TestResult {
    init_tracing();
    let dir = scratch();
    let cfg = config(
        dir.path(),
        ExecBuilder::new("check", "servers")
            .run("cat /etc/hosts")
            .expect("server0")
            .expect("server2"),
    );
    let backend = FakeBackend::new()
        .exec_stdout("server0", &["a", "server0", "b", "server2"])
        .exec_stdout("server1", &["server0", "server1", "server2"])
        .exec_stdout("server2", &["server0 server2"; 2]);

    let report = execution(&cfg, &backend).run().await?;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(backend.execs().len(), 3);
    Ok(())
}

#[tokio::test]
async fn out_of_order_output_fails_verification() -> TestResult {
    let dir = scratch();
    let cfg = config(
        dir.path(),
        ExecBuilder::new("check", "servers")
            .ids("1")
            .run("cat /etc/hosts")
            .expect("B")
            .expect("A"),
    );
    let backend = FakeBackend::new().exec_stdout("server1", &["A", "B"]);
    let mut exec = execution(&cfg, &backend);

    let report = exec.run().await?;
    assert_eq!(report.failed, vec!["check"]);
    let error = exec.task("check").unwrap().error().unwrap();
    assert!(error.starts_with("Verification failed"), "{error}");
    assert!(error.contains("server1"));
    assert!(error.contains("'A'"));
    Ok(())
}

#[tokio::test]
async fn commands_are_substituted_and_targeted_per_id() -> TestResult {
    let dir = scratch();
    let cfg = config(
        dir.path(),
        ExecBuilder::new("ping", "servers")
            .ids("0,2")
            .run("sh -c 'echo node ${id}'")
            .expect("node ${id}"),
    );
    let backend = FakeBackend::new()
        .exec_stdout("server0", &["node 0"])
        .exec_stdout("server2", &["node 2"]);

    let report = execution(&cfg, &backend).run().await?;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(
        backend.execs(),
        vec![
            ("server0".to_string(), vec!["sh".to_string(), "-c".to_string(), "echo node 0".to_string()]),
            ("server2".to_string(), vec!["sh".to_string(), "-c".to_string(), "echo node 2".to_string()]),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failure_view_is_trimmed() -> TestResult {
    let dir = scratch();
    let cfg = config(
        dir.path(),
        ExecBuilder::new("check", "servers")
            .ids("0")
            .run("seq 100")
            .expect("never"),
    );
    let lines: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let backend = FakeBackend::new().exec_stdout("server0", &refs);
    let mut exec = execution(&cfg, &backend);

    exec.run().await?;
    let error = exec.task("check").unwrap().error().unwrap();
    assert!(error.contains(ELISION));
    assert!(error.contains("\n99"));
    assert!(!error.contains("\n50\n"));
    Ok(())
}

#[test]
fn unknown_exec_id_is_a_config_error() {
    let dir = scratch();
    let cfg = config(
        dir.path(),
        ExecBuilder::new("check", "servers").ids("5").run("true"),
    );
    let err = dockrig::engine::Execution::from_config(&cfg, FakeBackend::new()).unwrap_err();
    assert!(matches!(err, dockrig::errors::RigError::ConfigError(_)));
}

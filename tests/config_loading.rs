// tests/config_loading.rs

mod common;
use crate::common::{FakeBackend, scratch};

use std::error::Error;
use std::fs;

use dockrig::cli::CliArgs;
use dockrig::config::load_and_validate;
use dockrig::engine::Execution;
use dockrig::errors::RigError;
use dockrig::task::TaskKind;

type TestResult = Result<(), Box<dyn Error>>;

const RIG: &str = r#"
[execution]
name = "kv"
workdir = "work"
settle_secs = 0

[properties]
root = "assets"
java = "openjdk-7-jdk"

[proxy]
http = "proxy:3128"

[[task]]
kind = "image"
name = "server-image"
install = ["${java}"]
startup = { scripts = ["start.sh"], paths = ["${root}/scripts"] }
copy = [{ src = "${root}/app.jar", dst = "/opt/app" }]

[[task]]
kind = "containers"
name = "servers"
image = "server-image"
ids = "0:2"
name_pattern = "server${id}.kv"

[[task]]
kind = "exec"
name = "check"
depends = "servers"
containers = "servers"
run = ["cat /etc/hosts"]
expect = ["server0.kv", "server1.kv"]
"#;

fn write_rig(dir: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    let scripts = dir.join("assets/scripts/nested");
    fs::create_dir_all(&scripts)?;
    fs::write(scripts.join("start.sh"), "echo start\n")?;
    fs::write(dir.join("assets/app.jar"), "jar")?;
    let path = dir.join("Dockrig.toml");
    fs::write(&path, RIG)?;
    Ok(path)
}

#[tokio::test]
async fn relative_paths_resolve_against_the_config_file() -> TestResult {
    let dir = scratch();
    let path = write_rig(dir.path())?;
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.workdir(), dir.path().join("work"));
    let mut exec = Execution::from_config(&cfg, FakeBackend::new())?;

    let TaskKind::Image(image) = exec.task("server-image").unwrap().kind() else {
        panic!("expected an image task");
    };
    assert_eq!(image.spec().packages, vec!["openjdk-7-jdk"]);
    assert_eq!(image.spec().proxy.http.as_deref(), Some("proxy:3128"));
    assert_eq!(image.spec().copies[0].0, dir.path().join("assets/app.jar"));

    let report = exec.run().await?;
    assert_eq!(report.failed, vec!["check"], "fake exec output is empty");

    let context = dir.path().join("work/image/server-image");
    for name in ["Dockerfile", "start.sh", "app.jar", "entrypoint.sh"] {
        assert!(context.join(name).is_file(), "{name} missing from build context");
    }
    let dockerfile = fs::read_to_string(context.join("Dockerfile"))?;
    assert!(dockerfile.contains("ENV http_proxy http://proxy:3128"));
    assert!(dockerfile.contains("COPY app.jar /opt/app/"));
    Ok(())
}

#[tokio::test]
async fn missing_startup_script_is_a_build_failure() -> TestResult {
    let dir = scratch();
    let path = write_rig(dir.path())?;
    fs::remove_file(dir.path().join("assets/scripts/nested/start.sh"))?;

    let cfg = load_and_validate(&path)?;
    let mut exec = Execution::from_config(&cfg, FakeBackend::new())?;
    let report = exec.run().await?;

    assert_eq!(report.failed, vec!["server-image"]);
    let error = exec.task("server-image").unwrap().error().unwrap();
    assert!(error.starts_with("Image build failed"), "{error}");
    Ok(())
}

#[test]
fn reserved_property_name_is_rejected() -> TestResult {
    let dir = scratch();
    let path = dir.path().join("Dockrig.toml");
    fs::write(
        &path,
        "[execution]\nname = \"x\"\n[properties]\nid = \"3\"\n[[task]]\nkind = \"image\"\nname = \"i\"\n",
    )?;
    assert!(matches!(load_and_validate(&path), Err(RigError::ConfigError(_))));
    Ok(())
}

#[test]
fn unknown_task_kind_is_a_parse_error() -> TestResult {
    let dir = scratch();
    let path = dir.path().join("Dockrig.toml");
    fs::write(
        &path,
        "[execution]\nname = \"x\"\n[[task]]\nkind = \"vm\"\nname = \"i\"\n",
    )?;
    assert!(matches!(load_and_validate(&path), Err(RigError::TomlError(_))));
    Ok(())
}

#[tokio::test]
async fn dry_run_does_not_touch_the_engine() -> TestResult {
    let dir = scratch();
    let path = write_rig(dir.path())?;
    let args = CliArgs {
        config: path.display().to_string(),
        workdir: None,
        no_dns: false,
        log_level: None,
        dry_run: true,
    };
    dockrig::run(args).await?;
    assert!(!dir.path().join("work").exists());
    Ok(())
}

#[test]
fn dry_run_plan_includes_dns_when_the_bridge_is_configured() -> TestResult {
    let dir = scratch();
    let path = write_rig(dir.path())?;
    let text = fs::read_to_string(&path)?.replace(
        "settle_secs = 0\n",
        "settle_secs = 0\nbridge_address = \"10.1.0.1\"\n",
    );
    fs::write(&path, text)?;
    let cfg = load_and_validate(&path)?;
    let backend = FakeBackend::new();
    let mut exec = Execution::from_config(&cfg, backend.clone())?;

    let plan = dockrig::dry_run_plan(&cfg, &mut exec, true)?;
    assert!(plan.contains("  - dns-image (image)"), "{plan}");
    assert!(plan.contains("  - dns (containers)"), "{plan}");
    assert!(plan.contains(r#"depends: ["server-image", "dns"]"#), "{plan}");
    assert!(plan.contains("  dns = 10.1.0.2"), "{plan}");
    assert!(plan.contains("  server0.kv = 10.1.0.3"), "{plan}");
    assert!(!plan.contains("added at run time"));
    assert!(backend.calls().is_empty());
    assert!(!dir.path().join("work").exists());
    Ok(())
}

#[test]
fn dry_run_plan_notes_dns_without_a_bridge() -> TestResult {
    let dir = scratch();
    let path = write_rig(dir.path())?;
    let cfg = load_and_validate(&path)?;
    let backend = FakeBackend::new();
    let mut exec = Execution::from_config(&cfg, backend.clone())?;

    let plan = dockrig::dry_run_plan(&cfg, &mut exec, true)?;
    assert!(plan.contains("'dns-image' and 'dns' are added at run time"), "{plan}");
    assert!(!plan.contains("  - dns (containers)"));
    assert!(backend.calls().is_empty());
    Ok(())
}

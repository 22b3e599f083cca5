// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod net;
pub mod report;
pub mod task;
pub mod types;

use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Execution, ExecutionReport};
use crate::exec::{Backend, DockerBackend};
use crate::net::{DNS_IMAGE_TASK, DNS_TASK, DnsProvisioner};
use crate::task::TaskKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registration
/// - DNS provisioning (unless disabled)
/// - the execution loop against the `docker` CLI
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(dir) = &args.workdir {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("resolving working directory {dir}"))?;
        cfg.execution.workdir = Some(dir.display().to_string());
    }

    let backend = DockerBackend::new(cfg.execution.docker.clone());
    debug!(engine = backend.program(), "using container engine");
    let mut execution = Execution::from_config(&cfg, backend)?;
    let dns = dns_wanted(&cfg, &args, &execution);

    if args.dry_run {
        print!("{}", dry_run_plan(&cfg, &mut execution, dns)?);
        return Ok(());
    }

    if dns {
        let bridge = bridge_address(&cfg, execution.backend()).await?;
        info!(%bridge, "allocating container addresses");
        DnsProvisioner::from_config(&cfg).provision(&mut execution, bridge)?;
    }

    let report = execution.run().await?;
    check_report(&report)
}

fn dns_wanted<B: Backend>(cfg: &ConfigFile, args: &CliArgs, execution: &Execution<B>) -> bool {
    if args.no_dns || !cfg.dns.enabled {
        debug!("DNS provisioning disabled");
        return false;
    }
    execution.tasks().iter().any(|t| t.as_containers().is_some())
}

/// Configured bridge address, or the one the engine reports.
async fn bridge_address<B: Backend>(cfg: &ConfigFile, backend: &B) -> Result<Ipv4Addr> {
    match &cfg.execution.bridge_address {
        Some(addr) => Ok(addr.parse()?),
        None => Ok(backend
            .bridge_address()
            .await
            .context("detecting the bridge address")?),
    }
}

fn check_report(report: &ExecutionReport) -> Result<()> {
    if report.is_success() {
        info!(execution = %report.execution, "all tasks succeeded");
        return Ok(());
    }
    bail!(
        "execution '{}' did not complete: failed {:?}, not run {:?}",
        report.execution,
        report.failed,
        report.not_run
    )
}

/// Execution plan in dependency order, as printed by `--dry-run`.
///
/// When DNS is wanted and `[execution].bridge_address` is set, the DNS tasks
/// are provisioned first so the plan matches a real run. Without a configured
/// bridge the engine would have to be asked, so the plan only notes them.
pub fn dry_run_plan<B: Backend>(
    cfg: &ConfigFile,
    execution: &mut Execution<B>,
    dns: bool,
) -> Result<String> {
    let assignment = match (dns, &cfg.execution.bridge_address) {
        (true, Some(addr)) => {
            DnsProvisioner::from_config(cfg).provision(execution, addr.parse()?)?
        }
        _ => None,
    };

    let mut out = String::new();
    writeln!(out, "dockrig dry-run: {}", cfg.execution.name)?;
    writeln!(out, "  workdir = {}", cfg.workdir().display())?;
    writeln!(out, "  base_image = {}", cfg.execution.base_image)?;
    writeln!(out, "  promotion = {:?}", cfg.execution.promotion)?;
    writeln!(
        out,
        "  dns = {}",
        if dns { cfg.dns.hostname.as_str() } else { "disabled" }
    )?;
    if !cfg.properties.is_empty() {
        writeln!(out, "  properties = {:?}", cfg.properties)?;
    }
    if dns && assignment.is_none() {
        writeln!(
            out,
            "  note: tasks '{DNS_IMAGE_TASK}' and '{DNS_TASK}' are added at run time, \
             once the bridge address is known"
        )?;
    }
    writeln!(out)?;

    let graph = execution.graph();
    let order = graph.topological_order()?;
    writeln!(out, "tasks ({}):", order.len())?;
    for idx in order {
        let task = &execution.tasks()[idx];
        writeln!(out, "  - {} ({})", task.name(), task.kind().label())?;
        if !task.depends().is_empty() {
            writeln!(out, "      depends: {:?}", task.depends())?;
        }
        match task.kind() {
            TaskKind::Image(image) => {
                writeln!(out, "      tag: {}", image.tag())?;
                if !image.spec().startup_scripts.is_empty() {
                    writeln!(out, "      startup: {:?}", image.spec().startup_scripts)?;
                }
            }
            TaskKind::Containers(group) => {
                writeln!(out, "      image: {}", group.image())?;
                writeln!(out, "      containers: {:?}", group.container_names())?;
            }
            TaskKind::Exec(exec) => {
                let containers: Vec<&str> =
                    exec.targets().iter().map(|(_, c)| c.as_str()).collect();
                writeln!(out, "      targets: {containers:?}")?;
            }
        }
    }

    if let Some(assignment) = assignment {
        writeln!(out)?;
        writeln!(out, "addresses:")?;
        for (container, addr) in assignment.to_map() {
            writeln!(out, "  {container} = {addr}")?;
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(out)
}

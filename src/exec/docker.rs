// src/exec/docker.rs

//! `docker` CLI backend.

use std::net::Ipv4Addr;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::process::Command;
use tracing::debug;

use super::backend::{Backend, BackendFuture, CommandOutput, RunSpec};
use super::command::{build_args, exec_args, logs_args, remove_args, render_command_line, run_args};
use crate::errors::{Result, RigError};

/// Backend that runs the engine's CLI as a child process per call.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    program: String,
}

impl DockerBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn invoke(&self, args: Vec<String>) -> Result<CommandOutput> {
        debug!(program = %self.program, ?args, "invoking container engine");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawning '{}'", render_command_line(&self.program, &args)))?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(program = %self.program, exit_code, "container engine command exited");

        Ok(CommandOutput {
            exit_code,
            stdout: split_lines(&output.stdout),
            stderr: split_lines(&output.stderr),
        })
    }
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self::new("docker")
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

impl Backend for DockerBackend {
    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(self.invoke(build_args(context, Some(tag))))
    }

    fn run<'a>(&'a self, spec: &'a RunSpec) -> BackendFuture<'a, CommandOutput> {
        Box::pin(self.invoke(run_args(spec)))
    }

    fn exec<'a>(
        &'a self,
        container: &'a str,
        argv: &'a [String],
    ) -> BackendFuture<'a, CommandOutput> {
        Box::pin(self.invoke(exec_args(container, argv)))
    }

    fn logs<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(self.invoke(logs_args(container)))
    }

    fn remove<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(self.invoke(remove_args(container)))
    }

    fn bridge_address(&self) -> BackendFuture<'_, Ipv4Addr> {
        Box::pin(async move {
            let args = vec![
                "network".to_string(),
                "inspect".to_string(),
                "bridge".to_string(),
                "--format".to_string(),
                "{{range .IPAM.Config}}{{.Gateway}} {{end}}".to_string(),
            ];
            let out = self.invoke(args).await?;
            if !out.is_success() {
                return Err(RigError::Other(anyhow!(
                    "inspecting bridge network failed (exit {}): {}",
                    out.exit_code,
                    out.stderr.join(" ")
                )));
            }
            parse_gateway(&out.stdout).ok_or_else(|| {
                RigError::Other(anyhow!(
                    "no IPv4 gateway on the bridge network; set [execution].bridge_address"
                ))
            })
        })
    }
}

/// First IPv4 address in `network inspect` output.
fn parse_gateway(lines: &[String]) -> Option<Ipv4Addr> {
    lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .find_map(|word| word.parse::<Ipv4Addr>().ok())
}

// src/exec/command.rs

//! Argument vectors for engine commands.
//!
//! Shapes:
//! - `build [-t <tag>] <context-dir>`
//! - `run [--detach=true] [--hostname=<h>] [--name=<n>] [--cap-add=<c>]*
//!   [--mac-address=<m>] [--dns=<d>] [--volume=<src>:<dst>:ro]*
//!   [--env="<K>=<V>"]* <image>`
//! - `exec <container> <argv...>`
//! - `logs <container>`
//!
//! Arguments are passed to the engine without a shell, so `--env` values are
//! not quoted in the argv; [`render_command_line`] adds the quotes back for
//! display.

use std::path::Path;

use super::backend::RunSpec;

const ENV_FLAG: &str = "--env=";

pub fn build_args(context: &Path, tag: Option<&str>) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if let Some(tag) = tag {
        args.push("-t".to_string());
        args.push(tag.to_string());
    }
    args.push(context.display().to_string());
    args
}

pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if spec.detach {
        args.push("--detach=true".to_string());
    }
    if let Some(hostname) = &spec.hostname {
        args.push(format!("--hostname={hostname}"));
    }
    if let Some(name) = &spec.name {
        args.push(format!("--name={name}"));
    }
    for cap in &spec.cap_add {
        args.push(format!("--cap-add={cap}"));
    }
    if let Some(mac) = &spec.mac_address {
        args.push(format!("--mac-address={mac}"));
    }
    if let Some(dns) = &spec.dns {
        args.push(format!("--dns={dns}"));
    }
    for volume in &spec.volumes {
        args.push(format!("--volume={volume}"));
    }
    for (key, value) in &spec.envs {
        args.push(format!("{ENV_FLAG}{key}={value}"));
    }
    args.push(spec.image.clone());
    args
}

pub fn exec_args(container: &str, argv: &[String]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), container.to_string()];
    args.extend(argv.iter().cloned());
    args
}

pub fn logs_args(container: &str) -> Vec<String> {
    vec!["logs".to_string(), container.to_string()]
}

pub fn remove_args(container: &str) -> Vec<String> {
    vec!["rm".to_string(), "--force".to_string(), container.to_string()]
}

/// Human-readable command line, recorded in task output.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    format!("{program} {}", render_args(args))
}

/// Space-joined arguments with `--env` values quoted.
pub fn render_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| match arg.strip_prefix(ENV_FLAG) {
            Some(pair) => format!("{ENV_FLAG}\"{pair}\""),
            None => arg.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

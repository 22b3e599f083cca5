// src/exec/backend.rs

//! Pluggable container-engine backend.
//!
//! Tasks talk to a `Backend` instead of spawning engine processes directly.
//! This makes it easy to swap in a fake engine in tests while keeping the
//! production implementation in [`super::docker`].
//!
//! - [`super::DockerBackend`] shells out to the `docker` CLI.
//! - Tests can provide their own `Backend` that, for example, records every
//!   call and returns scripted exit codes and output.

use std::future::Future;
use std::net::Ipv4Addr;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed future returned by every [`Backend`] operation.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Exit code plus captured output lines of one engine command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(stdout: Vec<String>) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr: Vec::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: Vec<String>) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything needed to launch one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub detach: bool,
    pub hostname: Option<String>,
    pub name: Option<String>,
    pub cap_add: Vec<String>,
    pub mac_address: Option<String>,
    pub dns: Option<String>,
    /// Already formatted as `<src>:<dst>:ro`.
    pub volumes: Vec<String>,
    /// `(name, value)` pairs.
    pub envs: Vec<(String, String)>,
}

/// Trait abstracting the container engine.
///
/// Production code uses [`super::DockerBackend`]; tests can provide their own
/// implementation that doesn't touch a real engine.
pub trait Backend: Send + Sync {
    /// Build `context` into an image tagged `tag`.
    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> BackendFuture<'a, CommandOutput>;

    /// Launch a container.
    fn run<'a>(&'a self, spec: &'a RunSpec) -> BackendFuture<'a, CommandOutput>;

    /// Run `argv` inside an already running container.
    fn exec<'a>(&'a self, container: &'a str, argv: &'a [String])
        -> BackendFuture<'a, CommandOutput>;

    /// Fetch a container's stdout/stderr logs.
    fn logs<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput>;

    /// Force-remove a container left over from an earlier run. Callers ignore
    /// the exit code: the container usually does not exist.
    fn remove<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput>;

    /// Address of the engine's bridge interface.
    fn bridge_address(&self) -> BackendFuture<'_, Ipv4Addr>;
}

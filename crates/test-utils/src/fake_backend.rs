use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dockrig::exec::{Backend, BackendFuture, CommandOutput, RunSpec};

/// One call received by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Build { context: PathBuf, tag: String },
    Run(RunSpec),
    Exec { container: String, argv: Vec<String> },
    Logs(String),
    Remove(String),
    BridgeAddress,
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<Call>,
    build_exit: HashMap<String, i32>,
    run_exit: HashMap<String, i32>,
    exec_stdout: HashMap<String, Vec<String>>,
    bridge: Ipv4Addr,
}

/// A fake container engine that:
/// - records every call in order
/// - succeeds unless a tag or container was scripted to fail
/// - answers `exec` with scripted stdout per container
///
/// Clones share state, so a test can keep a handle after moving one into an
/// execution.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                build_exit: HashMap::new(),
                run_exit: HashMap::new(),
                exec_stdout: HashMap::new(),
                bridge: Ipv4Addr::new(172, 17, 0, 1),
            })),
        }
    }

    pub fn with_bridge(self, bridge: Ipv4Addr) -> Self {
        self.state.lock().unwrap().bridge = bridge;
        self
    }

    /// Make `build` of `tag` exit with `code`.
    pub fn fail_build(self, tag: &str, code: i32) -> Self {
        self.state.lock().unwrap().build_exit.insert(tag.to_string(), code);
        self
    }

    /// Make `run` of `container` exit with `code`.
    pub fn fail_run(self, container: &str, code: i32) -> Self {
        self.state.lock().unwrap().run_exit.insert(container.to_string(), code);
        self
    }

    /// Stdout returned by every `exec` in `container`.
    pub fn exec_stdout(self, container: &str, lines: &[&str]) -> Self {
        self.state.lock().unwrap().exec_stdout.insert(
            container.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Tags passed to `build`, in order.
    pub fn built_tags(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Build { tag, .. } => Some(tag),
                _ => None,
            })
            .collect()
    }

    /// Specs passed to `run`, in order.
    pub fn launched(&self) -> Vec<RunSpec> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Run(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    /// Container names passed to `run`, in order.
    pub fn launched_names(&self) -> Vec<String> {
        self.launched()
            .into_iter()
            .filter_map(|spec| spec.name)
            .collect()
    }

    /// `(container, argv)` of every `exec`, in order.
    pub fn execs(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Exec { container, argv } => Some((container, argv)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Backend for FakeBackend {
    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(async move {
            self.record(Call::Build {
                context: context.to_path_buf(),
                tag: tag.to_string(),
            });
            let code = self.state.lock().unwrap().build_exit.get(tag).copied();
            Ok(match code {
                Some(code) => CommandOutput::failed(code, vec![format!("build of {tag} failed")]),
                None => CommandOutput::success(vec![format!("Successfully built {tag}")]),
            })
        })
    }

    fn run<'a>(&'a self, spec: &'a RunSpec) -> BackendFuture<'a, CommandOutput> {
        Box::pin(async move {
            self.record(Call::Run(spec.clone()));
            let name = spec.name.clone().unwrap_or_default();
            let code = self.state.lock().unwrap().run_exit.get(&name).copied();
            Ok(match code {
                Some(code) => CommandOutput::failed(code, vec![format!("cannot start {name}")]),
                None => CommandOutput::success(vec![format!("{name}-id")]),
            })
        })
    }

    fn exec<'a>(
        &'a self,
        container: &'a str,
        argv: &'a [String],
    ) -> BackendFuture<'a, CommandOutput> {
        Box::pin(async move {
            self.record(Call::Exec {
                container: container.to_string(),
                argv: argv.to_vec(),
            });
            let stdout = self
                .state
                .lock()
                .unwrap()
                .exec_stdout
                .get(container)
                .cloned()
                .unwrap_or_default();
            Ok(CommandOutput::success(stdout))
        })
    }

    fn logs<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(async move {
            self.record(Call::Logs(container.to_string()));
            Ok(CommandOutput::success(vec![format!("{container} started")]))
        })
    }

    fn remove<'a>(&'a self, container: &'a str) -> BackendFuture<'a, CommandOutput> {
        Box::pin(async move {
            self.record(Call::Remove(container.to_string()));
            Ok(CommandOutput::failed(1, vec![format!("No such container: {container}")]))
        })
    }

    fn bridge_address(&self) -> BackendFuture<'_, Ipv4Addr> {
        Box::pin(async move {
            self.record(Call::BridgeAddress);
            Ok(self.state.lock().unwrap().bridge)
        })
    }
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::PromotionPolicy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [execution]
/// name = "kv"
///
/// [[task]]
/// kind = "image"
/// name = "server-image"
/// install = ["openjdk-7-jdk"]
///
/// [[task]]
/// kind = "containers"
/// name = "servers"
/// image = "server-image"
/// ids = "0:3"
/// name_pattern = "server${id}.kv"
/// ```
///
/// Task order in the file is declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub execution: ExecutionSection,

    /// Execution-wide proxy applied to every image.
    #[serde(default)]
    pub proxy: ProxySection,

    #[serde(default)]
    pub dns: DnsSection,

    /// `${key}` substitutions; already applied by the loader, kept for dry-run output.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub task: Vec<TaskDescriptor>,
}

/// Validated configuration. Construct via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub execution: ExecutionSection,
    pub proxy: ProxySection,
    pub dns: DnsSection,
    pub properties: BTreeMap<String, String>,
    pub task: Vec<TaskDescriptor>,
    /// Directory relative paths are resolved against (the config file's parent).
    pub base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            execution: raw.execution,
            proxy: raw.proxy,
            dns: raw.dns,
            properties: raw.properties,
            task: raw.task,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Resolve a possibly-relative path against [`ConfigFile::base_dir`].
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.base_dir.join(p)
        }
    }

    /// Effective working directory for this execution.
    pub fn workdir(&self) -> PathBuf {
        match &self.execution.workdir {
            Some(dir) => self.resolve_path(dir),
            None => std::env::temp_dir().join(format!("dockrig-{}", self.execution.name)),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    /// Execution name; image tags are `<name>/<image-task>`.
    pub name: String,

    /// Working directory; wiped at the start of each run.
    #[serde(default)]
    pub workdir: Option<String>,

    #[serde(default = "default_base_image")]
    pub base_image: String,

    /// Default post-launch settle interval for container groups.
    #[serde(default)]
    pub settle_secs: u64,

    /// Head/tail window used when logging captured output.
    #[serde(default = "default_log_window")]
    pub log_window: usize,

    #[serde(default)]
    pub promotion: PromotionPolicy,

    /// Container engine executable.
    #[serde(default = "default_docker")]
    pub docker: String,

    /// Skip bridge detection and seed the address allocator with this.
    #[serde(default)]
    pub bridge_address: Option<String>,
}

fn default_base_image() -> String {
    "ubuntu:14.04".to_string()
}

fn default_log_window() -> usize {
    20
}

fn default_docker() -> String {
    "docker".to_string()
}

impl ExecutionSection {
    /// Section with every optional field at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workdir: None,
            base_image: default_base_image(),
            settle_secs: 0,
            log_window: default_log_window(),
            promotion: PromotionPolicy::default(),
            docker: default_docker(),
            bridge_address: None,
        }
    }
}

/// `[proxy]` section, also used for per-image overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProxySection {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
}

/// `[dns]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Container name and hostname of the synthesized DNS instance.
    #[serde(default = "default_dns_hostname")]
    pub hostname: String,

    #[serde(default = "default_dns_packages")]
    pub packages: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_dns_hostname() -> String {
    "dns".to_string()
}

fn default_dns_packages() -> Vec<String> {
    vec!["dnsmasq".to_string(), "host".to_string(), "iproute2".to_string()]
}

impl Default for DnsSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            hostname: default_dns_hostname(),
            packages: default_dns_packages(),
        }
    }
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskDescriptor {
    Image(ImageDescriptor),
    Containers(ContainersDescriptor),
    Exec(ExecDescriptor),
}

impl TaskDescriptor {
    pub fn name(&self) -> &str {
        match self {
            TaskDescriptor::Image(d) => &d.name,
            TaskDescriptor::Containers(d) => &d.name,
            TaskDescriptor::Exec(d) => &d.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TaskDescriptor::Image(_) => "image",
            TaskDescriptor::Containers(_) => "containers",
            TaskDescriptor::Exec(_) => "exec",
        }
    }

    /// Declared dependencies, without the implicit image/containers reference.
    pub fn depends(&self) -> Vec<String> {
        match self {
            TaskDescriptor::Image(d) => d.depends.names(),
            TaskDescriptor::Containers(d) => d.depends.names(),
            TaskDescriptor::Exec(d) => d.depends.names(),
        }
    }
}

/// Dependency list: either `"a, b"` or `["a", "b"]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependsList {
    Csv(String),
    List(Vec<String>),
}

impl Default for DependsList {
    fn default() -> Self {
        DependsList::List(Vec::new())
    }
}

impl DependsList {
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            DependsList::Csv(s) => s.split(',').collect(),
            DependsList::List(v) => v.iter().map(|s| s.as_str()).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Instance ids: either the `"0:3,7"` grammar or an integer array.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IdSpec {
    Expr(String),
    List(Vec<u32>),
}

/// `kind = "image"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageDescriptor {
    pub name: String,

    #[serde(default)]
    pub depends: DependsList,

    /// Overrides `[proxy]` for this image when present.
    #[serde(default)]
    pub proxy: Option<ProxySection>,

    #[serde(default)]
    pub install: Vec<String>,

    #[serde(default)]
    pub startup: Option<StartupSection>,

    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub copy: Vec<CopyEntry>,
}

/// Startup scripts, looked up by name under `paths`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartupSection {
    pub scripts: Vec<String>,

    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyEntry {
    pub src: String,
    pub dst: String,
}

/// `kind = "containers"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainersDescriptor {
    pub name: String,

    #[serde(default)]
    pub depends: DependsList,

    /// Name of an image task declared earlier.
    pub image: String,

    pub ids: IdSpec,

    /// `${id}` pattern for container names.
    #[serde(default)]
    pub name_pattern: Option<String>,

    /// Explicit per-id container names; keys are ids.
    #[serde(default)]
    pub names: BTreeMap<String, String>,

    /// Overrides `[execution].settle_secs`.
    #[serde(default)]
    pub settle_secs: Option<u64>,

    #[serde(default)]
    pub volume: Vec<VolumeEntry>,

    #[serde(default)]
    pub env: Vec<EnvEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeEntry {
    pub src: String,
    pub dst: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// `kind = "exec"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecDescriptor {
    pub name: String,

    #[serde(default)]
    pub depends: DependsList,

    /// Name of a containers task declared earlier.
    pub containers: String,

    /// Subset of the group's ids; defaults to all of them.
    #[serde(default)]
    pub ids: Option<IdSpec>,

    #[serde(default)]
    pub run: Vec<String>,

    /// Regexes that must match the combined output in order.
    #[serde(default)]
    pub expect: Vec<String>,
}

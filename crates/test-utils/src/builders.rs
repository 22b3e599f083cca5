#![allow(dead_code)]

use std::collections::BTreeMap;

use dockrig::config::{
    ConfigFile, ContainersDescriptor, DependsList, DnsSection, EnvEntry, ExecDescriptor,
    ExecutionSection, IdSpec, ImageDescriptor, ProxySection, RawConfigFile, StartupSection,
    TaskDescriptor, VolumeEntry,
};
use dockrig::types::PromotionPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(execution: &str) -> Self {
        Self {
            config: RawConfigFile {
                execution: ExecutionSection::named(execution),
                proxy: ProxySection::default(),
                dns: DnsSection::default(),
                properties: BTreeMap::new(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskDescriptor) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn workdir(mut self, dir: &str) -> Self {
        self.config.execution.workdir = Some(dir.to_string());
        self
    }

    pub fn promotion(mut self, policy: PromotionPolicy) -> Self {
        self.config.execution.promotion = policy;
        self
    }

    pub fn dns_hostname(mut self, hostname: &str) -> Self {
        self.config.dns.hostname = hostname.to_string();
        self
    }

    pub fn without_dns(mut self) -> Self {
        self.config.dns.enabled = false;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `kind = "image"` tasks.
pub struct ImageBuilder {
    task: ImageDescriptor,
}

impl ImageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            task: ImageDescriptor {
                name: name.to_string(),
                ..ImageDescriptor::default()
            },
        }
    }

    pub fn install(mut self, package: &str) -> Self {
        self.task.install.push(package.to_string());
        self
    }

    pub fn startup(mut self, scripts: &[&str], paths: &[&str]) -> Self {
        self.task.startup = Some(StartupSection {
            scripts: scripts.iter().map(|s| s.to_string()).collect(),
            paths: paths.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        push_depend(&mut self.task.depends, dep);
        self
    }

    pub fn build(self) -> TaskDescriptor {
        TaskDescriptor::Image(self.task)
    }
}

/// Builder for `kind = "containers"` tasks.
pub struct ContainersBuilder {
    task: ContainersDescriptor,
}

impl ContainersBuilder {
    pub fn new(name: &str, image: &str, ids: &str) -> Self {
        Self {
            task: ContainersDescriptor {
                name: name.to_string(),
                depends: DependsList::default(),
                image: image.to_string(),
                ids: IdSpec::Expr(ids.to_string()),
                name_pattern: None,
                names: BTreeMap::new(),
                settle_secs: None,
                volume: Vec::new(),
                env: Vec::new(),
            },
        }
    }

    pub fn name_pattern(mut self, pattern: &str) -> Self {
        self.task.name_pattern = Some(pattern.to_string());
        self
    }

    pub fn volume(mut self, src: &str, dst: &str) -> Self {
        self.task.volume.push(VolumeEntry {
            src: src.to_string(),
            dst: dst.to_string(),
        });
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.task.env.push(EnvEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        push_depend(&mut self.task.depends, dep);
        self
    }

    pub fn build(self) -> TaskDescriptor {
        TaskDescriptor::Containers(self.task)
    }
}

/// Builder for `kind = "exec"` tasks.
pub struct ExecBuilder {
    task: ExecDescriptor,
}

impl ExecBuilder {
    pub fn new(name: &str, containers: &str) -> Self {
        Self {
            task: ExecDescriptor {
                name: name.to_string(),
                depends: DependsList::default(),
                containers: containers.to_string(),
                ids: None,
                run: Vec::new(),
                expect: Vec::new(),
            },
        }
    }

    pub fn ids(mut self, ids: &str) -> Self {
        self.task.ids = Some(IdSpec::Expr(ids.to_string()));
        self
    }

    pub fn run(mut self, command: &str) -> Self {
        self.task.run.push(command.to_string());
        self
    }

    pub fn expect(mut self, pattern: &str) -> Self {
        self.task.expect.push(pattern.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        push_depend(&mut self.task.depends, dep);
        self
    }

    pub fn build(self) -> TaskDescriptor {
        TaskDescriptor::Exec(self.task)
    }
}

fn push_depend(depends: &mut DependsList, dep: &str) {
    let mut names = depends.names();
    names.push(dep.to_string());
    *depends = DependsList::List(names);
}

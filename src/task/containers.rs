// src/task/containers.rs

use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use super::template::{NameTemplate, substitute};
use super::{TaskContext, TaskOutput};
use crate::errors::{Result, RigError};
use crate::exec::RunSpec;
use crate::exec::command::{render_args, run_args};
use crate::net::mac_for_ip;

/// Capabilities every container is launched with, so startup scripts can
/// reconfigure networking.
pub const CAPABILITIES: [&str; 2] = ["NET_ADMIN", "SYS_ADMIN"];

/// Environment variable carrying a container's assigned address.
pub const DESIRED_IP_ENV: &str = "HOST_DESIRED_IP";

/// Host directory bind-mounted read-only into every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeTemplate {
    pub src: String,
    pub dst: String,
}

/// Launches one detached container per instance id, all from one image.
///
/// Container name, hostname, volume paths and environment values may contain
/// `${id}`. Names are resolved once at construction and must be distinct.
#[derive(Debug, Clone)]
pub struct ContainerGroupTask {
    image: String,
    ids: Vec<u32>,
    names: Vec<String>,
    volumes: Vec<VolumeTemplate>,
    envs: Vec<(String, String)>,
    settle: Duration,
    addresses: Vec<Ipv4Addr>,
    macs: Vec<String>,
    dns: Option<Ipv4Addr>,
}

impl ContainerGroupTask {
    pub fn new(image: impl Into<String>, ids: Vec<u32>, names: &NameTemplate) -> Result<Self> {
        let names = names.resolve(&ids)?;
        Ok(Self {
            image: image.into(),
            ids,
            names,
            volumes: Vec::new(),
            envs: Vec::new(),
            settle: Duration::ZERO,
            addresses: Vec::new(),
            macs: Vec::new(),
            dns: None,
        })
    }

    pub fn with_volume(mut self, src: impl Into<String>, dst: impl Into<String>) -> Self {
        self.volumes.push(VolumeTemplate {
            src: src.into(),
            dst: dst.into(),
        });
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((name.into(), value.into()));
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Container names, parallel to [`ContainerGroupTask::ids`].
    pub fn container_names(&self) -> &[String] {
        &self.names
    }

    pub fn container_for(&self, id: u32) -> Option<&str> {
        self.ids
            .iter()
            .position(|&i| i == id)
            .map(|pos| self.names[pos].as_str())
    }

    pub fn addresses(&self) -> &[Ipv4Addr] {
        &self.addresses
    }

    pub fn mac_addresses(&self) -> &[String] {
        &self.macs
    }

    pub fn dns(&self) -> Option<Ipv4Addr> {
        self.dns
    }

    /// Assign one address per instance; MACs are derived from them.
    pub fn set_addresses(&mut self, addresses: Vec<Ipv4Addr>) -> Result<()> {
        if addresses.len() != self.ids.len() {
            return Err(RigError::config(format!(
                "{} addresses for {} containers",
                addresses.len(),
                self.ids.len()
            )));
        }
        self.macs = addresses.iter().copied().map(mac_for_ip).collect();
        self.addresses = addresses;
        Ok(())
    }

    pub fn set_dns(&mut self, dns: Ipv4Addr) {
        self.dns = Some(dns);
    }

    /// Launch description of the instance at `index`.
    pub fn run_spec(&self, index: usize) -> RunSpec {
        let id = self.ids[index];
        let name = self.names[index].clone();

        let mut envs: Vec<(String, String)> = self
            .envs
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, id)))
            .collect();
        if let Some(addr) = self.addresses.get(index) {
            envs.push((DESIRED_IP_ENV.to_string(), addr.to_string()));
        }

        RunSpec {
            image: self.image.clone(),
            detach: true,
            hostname: Some(name.clone()),
            name: Some(name),
            cap_add: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            mac_address: self.macs.get(index).cloned(),
            dns: self.dns.map(|d| d.to_string()),
            volumes: self
                .volumes
                .iter()
                .map(|v| format!("{}:{}:ro", substitute(&v.src, id), substitute(&v.dst, id)))
                .collect(),
            envs,
        }
    }

    pub(crate) async fn run(
        &mut self,
        task: &str,
        ctx: &TaskContext<'_>,
        out: &mut TaskOutput,
    ) -> Result<()> {
        let mut launched = Vec::with_capacity(self.ids.len());

        for (index, &id) in self.ids.iter().enumerate() {
            let name = &self.names[index];
            fs::create_dir_all(ctx.workdir.join("containers").join(name))?;

            for volume in &self.volumes {
                let src = substitute(&volume.src, id);
                if !Path::new(&src).is_dir() {
                    return Err(RigError::LaunchFailure(format!(
                        "volume source {src} for {name} is not a directory"
                    )));
                }
            }

            let stale = ctx.backend.remove(name).await?;
            debug!(container = %name, exit_code = stale.exit_code, "removed leftover container");

            ctx.reporter
                .task_progress(task, &format!("launching {name} (id {id})"));
            let spec = self.run_spec(index);
            out.push_out(format!("$ {}", render_args(&run_args(&spec))));

            let result = ctx.backend.run(&spec).await?;
            out.extend(&result);
            if !result.is_success() {
                return Err(RigError::LaunchFailure(format!(
                    "{name} (id {id}) exited with {}",
                    result.exit_code
                )));
            }
            launched.push(name.clone());
        }

        if !self.settle.is_zero() {
            ctx.reporter.task_progress(
                task,
                &format!("waiting {}s for containers to settle", self.settle.as_secs()),
            );
            tokio::time::sleep(self.settle).await;
        }

        for name in &launched {
            let logs = ctx.backend.logs(name).await?;
            if !logs.is_success() {
                warn!(container = %name, exit_code = logs.exit_code, "fetching container logs failed");
            }
            let dir = ctx.workdir.join("containers").join(name);
            fs::write(dir.join("log.out"), join_lines(&logs.stdout))?;
            fs::write(dir.join("log.err"), join_lines(&logs.stderr))?;
        }
        Ok(())
    }
}

fn join_lines(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> ContainerGroupTask {
        ContainerGroupTask::new(
            "kv/server",
            vec![0, 1, 2],
            &NameTemplate::Pattern("server${id}".into()),
        )
        .unwrap()
        .with_volume("/srv/${id}", "/data")
        .with_env("NODE", "n${id}")
    }

    #[test]
    fn names_are_resolved_per_id() {
        let g = group();
        assert_eq!(g.container_names(), ["server0", "server1", "server2"]);
        assert_eq!(g.container_for(2), Some("server2"));
        assert_eq!(g.container_for(7), None);
    }

    #[test]
    fn run_spec_substitutes_the_instance_id() {
        let mut g = group();
        g.set_addresses(vec![
            Ipv4Addr::new(172, 17, 0, 2),
            Ipv4Addr::new(172, 17, 0, 3),
            Ipv4Addr::new(172, 17, 0, 4),
        ])
        .unwrap();
        g.set_dns(Ipv4Addr::new(172, 17, 0, 1));

        let spec = g.run_spec(1);
        assert_eq!(spec.name.as_deref(), Some("server1"));
        assert_eq!(spec.hostname.as_deref(), Some("server1"));
        assert_eq!(spec.volumes, vec!["/srv/1:/data:ro"]);
        assert_eq!(
            spec.envs,
            vec![
                ("NODE".to_string(), "n1".to_string()),
                (DESIRED_IP_ENV.to_string(), "172.17.0.3".to_string()),
            ]
        );
        assert_eq!(spec.mac_address.as_deref(), Some("02:42:17:00:00:03"));
        assert_eq!(g.mac_addresses()[0], "02:42:17:00:00:02");
        assert_eq!(spec.dns.as_deref(), Some("172.17.0.1"));
        assert!(spec.detach);
    }

    #[test]
    fn address_count_must_match_instances() {
        let mut g = group();
        assert!(g.set_addresses(vec![Ipv4Addr::new(10, 0, 0, 1)]).is_err());
        assert!(g.addresses().is_empty());
    }

    #[test]
    fn colliding_names_are_rejected() {
        let err = ContainerGroupTask::new("img", vec![0, 1], &NameTemplate::Pattern("fixed".into()));
        assert!(matches!(err, Err(RigError::ConfigError(_))));
    }
}

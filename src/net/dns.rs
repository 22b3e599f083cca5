// src/net/dns.rs

//! Synthesized DNS for container groups.
//!
//! Before the execution runs, every container of every group gets an
//! address from one [`AddressAllocator`] (the DNS instance first). A DNS
//! image and a single DNS container are then registered; the DNS image
//! writes every `address hostname` pair to `/etc/hosts` and restarts
//! dnsmasq. Every group is made to depend on the DNS container and gets its
//! address as resolver.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::info;

use super::allocator::{AddressAllocator, AddressAssignment};
use crate::config::model::{ConfigFile, ProxySection};
use crate::engine::Execution;
use crate::engine::builder::image_tag;
use crate::errors::{Result, RigError};
use crate::exec::Backend;
use crate::task::template::NameTemplate;
use crate::task::{ContainerGroupTask, GeneratedFile, ImageBuildTask, ImageSpec, Task, TaskKind};

pub const DNS_IMAGE_TASK: &str = "dns-image";
pub const DNS_TASK: &str = "dns";
pub const IPCONFIG_SCRIPT: &str = "ipconfig.sh";
pub const DNS_SETUP_SCRIPT: &str = "dns_setup.sh";

/// Moves the primary interface to `$HOST_DESIRED_IP`, keeping the prefix
/// length and default route.
const IPCONFIG_BODY: &str = r#"#!/bin/bash
set -e
IFACE=$(ip -o -4 addr show scope global | awk '{print $2; exit}')
CIDR=$(ip -o -4 addr show dev "$IFACE" scope global | awk '{print $4; exit}')
OLD_IP=${CIDR%/*}
PREFIX=${CIDR#*/}
GATEWAY=$(ip route show default | awk '{print $3; exit}')
echo "moving $IFACE from $CIDR to $HOST_DESIRED_IP/$PREFIX"
ip addr add "$HOST_DESIRED_IP/$PREFIX" dev "$IFACE"
ip addr del "$CIDR" dev "$IFACE"
if [ -n "$GATEWAY" ]; then
    ip route replace default via "$GATEWAY" dev "$IFACE"
fi
umount /etc/hosts 2>/dev/null || true
sed -i "s/^$OLD_IP\b/$HOST_DESIRED_IP/" /etc/hosts
ip addr show dev "$IFACE"
"#;

/// Script that changes the container's address to `$HOST_DESIRED_IP`.
pub fn ipconfig_script() -> String {
    IPCONFIG_BODY.to_string()
}

/// Script that publishes `hosts` through dnsmasq.
pub fn dns_setup_script(hosts: &[(String, Ipv4Addr)]) -> String {
    let mut text = String::from("#!/bin/bash\n");
    for (hostname, addr) in hosts {
        text.push_str(&format!("echo \"{addr}\t{hostname}\" >> /etc/hosts\n"));
    }
    text.push_str("cat /etc/hosts\n");
    text.push_str("service dnsmasq restart\n");
    text
}

/// Adds the DNS tasks and the address plan to an execution.
#[derive(Debug, Clone)]
pub struct DnsProvisioner {
    hostname: String,
    packages: Vec<String>,
    base_image: String,
    proxy: ProxySection,
}

impl DnsProvisioner {
    pub fn new(hostname: impl Into<String>, base_image: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            packages: vec!["dnsmasq".into(), "host".into(), "iproute2".into()],
            base_image: base_image.into(),
            proxy: ProxySection::default(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            hostname: cfg.dns.hostname.clone(),
            packages: cfg.dns.packages.clone(),
            base_image: cfg.execution.base_image.clone(),
            proxy: cfg.proxy.clone(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Assign addresses and register the DNS tasks.
    ///
    /// Returns `None` without touching the execution when it has no
    /// container groups. On error the execution is left unchanged.
    pub fn provision<B: Backend>(
        &self,
        execution: &mut Execution<B>,
        bridge: Ipv4Addr,
    ) -> Result<Option<AddressAssignment>> {
        if execution.is_started() {
            return Err(RigError::config(format!(
                "cannot provision DNS: execution '{}' has already started",
                execution.name()
            )));
        }

        let groups: Vec<(String, Vec<String>)> = execution
            .tasks()
            .iter()
            .filter_map(|task| {
                task.as_containers()
                    .map(|g| (task.name().to_string(), g.container_names().to_vec()))
            })
            .collect();
        if groups.is_empty() {
            info!(execution = %execution.name(), "no container groups; skipping DNS");
            return Ok(None);
        }

        for reserved in [DNS_IMAGE_TASK, DNS_TASK] {
            if execution.task(reserved).is_some() {
                return Err(RigError::config(format!(
                    "task name '{reserved}' is reserved for the DNS container"
                )));
            }
        }

        // All draws happen before the execution is touched.
        let mut allocator = AddressAllocator::new(bridge);
        let mut assignment = AddressAssignment::new();
        let dns_addr = assignment.assign(&mut allocator, &self.hostname)?;

        let mut hosts = Vec::new();
        let mut plan = Vec::with_capacity(groups.len());
        for (group_name, containers) in &groups {
            let mut addrs = Vec::with_capacity(containers.len());
            for container in containers {
                let addr = assignment.assign(&mut allocator, container)?;
                hosts.push((container.clone(), addr));
                addrs.push(addr);
            }
            plan.push((group_name.as_str(), addrs));
        }

        let image = ImageSpec {
            proxy: self.proxy.clone(),
            packages: self.packages.clone(),
            startup_scripts: vec![IPCONFIG_SCRIPT.to_string(), DNS_SETUP_SCRIPT.to_string()],
            generated: vec![
                GeneratedFile::new(IPCONFIG_SCRIPT, ipconfig_script()),
                GeneratedFile::new(DNS_SETUP_SCRIPT, dns_setup_script(&hosts)),
            ],
            ..ImageSpec::new(self.base_image.clone())
        };
        let tag = image_tag(execution.name(), DNS_IMAGE_TASK);
        let names = NameTemplate::Explicit(BTreeMap::from([(0, self.hostname.clone())]));
        let mut dns = ContainerGroupTask::new(tag.clone(), vec![0], &names)?;
        dns.set_addresses(vec![dns_addr])?;

        execution.add_task(Task::new(
            DNS_IMAGE_TASK,
            TaskKind::Image(ImageBuildTask::new(tag, image)),
        ))?;
        execution.add_task(
            Task::new(DNS_TASK, TaskKind::Containers(dns)).with_depends([DNS_IMAGE_TASK]),
        )?;

        for (group_name, addrs) in plan {
            let group = execution
                .task_mut(group_name)
                .and_then(Task::as_containers_mut)
                .ok_or_else(|| RigError::config(format!("containers '{group_name}' vanished")))?;
            group.set_addresses(addrs)?;
            group.set_dns(dns_addr);
            execution.add_dependency(group_name, DNS_TASK)?;
        }

        info!(
            execution = %execution.name(),
            dns = %dns_addr,
            containers = hosts.len(),
            "provisioned DNS"
        );
        Ok(Some(assignment))
    }
}

// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, TaskDescriptor};
use crate::errors::{Result, RigError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RigError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_execution_section(cfg)?;
    validate_dns_section(cfg)?;
    validate_descriptors(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(RigError::config(
            "config must contain at least one [[task]] entry",
        ));
    }
    Ok(())
}

fn validate_execution_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.execution.name.trim().is_empty() {
        return Err(RigError::config("[execution].name must not be empty"));
    }
    if cfg.execution.log_window == 0 {
        return Err(RigError::config(
            "[execution].log_window must be >= 1 (got 0)",
        ));
    }
    if let Some(bridge) = &cfg.execution.bridge_address {
        bridge.parse::<std::net::Ipv4Addr>().map_err(|_| {
            RigError::config(format!(
                "[execution].bridge_address is not an IPv4 address: {bridge}"
            ))
        })?;
    }
    Ok(())
}

fn validate_dns_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dns.enabled && cfg.dns.hostname.trim().is_empty() {
        return Err(RigError::config("[dns].hostname must not be empty"));
    }
    Ok(())
}

fn validate_descriptors(cfg: &RawConfigFile) -> Result<()> {
    for task in cfg.task.iter() {
        if task.name().trim().is_empty() {
            return Err(RigError::config(format!(
                "a {} task has an empty name",
                task.kind()
            )));
        }
        if task.depends().iter().any(|d| d == task.name()) {
            return Err(RigError::config(format!(
                "task '{}' cannot depend on itself",
                task.name()
            )));
        }
        if let TaskDescriptor::Exec(exec) = task {
            if exec.run.is_empty() {
                return Err(RigError::config(format!(
                    "exec task '{}' has no `run` commands",
                    exec.name
                )));
            }
        }
    }
    Ok(())
}

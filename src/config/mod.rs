// src/config/mod.rs

//! Configuration loading and validation for dockrig.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, expanding `[properties]` (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//!
//! Graph-level checks (unique task names, dependency resolution, id subsets)
//! happen later, while the [`crate::engine::Execution`] is constructed.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ContainersDescriptor, CopyEntry, DependsList, DnsSection, EnvEntry,
    ExecDescriptor, ExecutionSection, IdSpec, ImageDescriptor, ProxySection, RawConfigFile,
    StartupSection, TaskDescriptor, VolumeEntry,
};

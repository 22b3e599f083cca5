#![allow(dead_code)]

use std::path::Path;

use tempfile::TempDir;

use dockrig::config::ConfigFile;
use dockrig::engine::Execution;

pub use dockrig_test_utils::builders;
pub use dockrig_test_utils::{Call, FakeBackend, init_tracing, with_timeout};

use builders::ConfigFileBuilder;

/// Fresh temporary directory; the execution workdir lives in `<tmp>/work`.
pub fn scratch() -> TempDir {
    tempfile::tempdir().expect("creating temp dir")
}

/// Config builder whose workdir lives inside `scratch`.
pub fn rig(name: &str, scratch: &Path) -> ConfigFileBuilder {
    ConfigFileBuilder::new(name).workdir(&scratch.join("work").display().to_string())
}

/// Execution over `cfg` talking to a clone of `backend`.
pub fn execution(cfg: &ConfigFile, backend: &FakeBackend) -> Execution<FakeBackend> {
    Execution::from_config(cfg, backend.clone()).expect("building execution")
}

// src/exec/mod.rs

//! Container-engine execution layer.
//!
//! - [`backend`] provides the `Backend` trait that every task talks to, plus
//!   the `RunSpec` / `CommandOutput` value types.
//! - [`command`] renders the argument vectors for build/run/exec/logs.
//! - [`docker`] contains `DockerBackend`, the production implementation that
//!   runs the `docker` CLI through `tokio::process`.

pub mod backend;
pub mod command;
pub mod docker;

pub use backend::{Backend, BackendFuture, CommandOutput, RunSpec};
pub use docker::DockerBackend;

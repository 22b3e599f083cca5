// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dockrig`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dockrig",
    version,
    about = "Build images and launch disposable container clusters from a task DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the rig description (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dockrig.toml")]
    pub config: String,

    /// Override the working directory from `[execution].workdir`.
    ///
    /// The directory is wiped at the start of every run.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<String>,

    /// Do not synthesize the DNS container or assign addresses.
    #[arg(long)]
    pub no_dns: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DOCKRIG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph, but don't touch the container engine.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

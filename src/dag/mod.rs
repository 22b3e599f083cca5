// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the dependency graph over registered tasks and rejects
//!   cycles as edges are added.
//! - [`scheduler`] contains the FIFO ready queue and the rule that decides
//!   when a dependent is promoted into it.

pub mod graph;
pub mod scheduler;

pub use graph::TaskGraph;
pub use scheduler::Scheduler;

// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, RigError};

/// Dependency graph over task indices, in registration order.
///
/// Edge direction: dependency -> dependent. Adjacency lists keep insertion
/// order so promotion is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    deps: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    edges: DiGraphMap<usize, ()>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; names are unique.
    pub fn add_node(&mut self, name: &str) -> Result<usize> {
        if self.index.contains_key(name) {
            return Err(RigError::config(format!("duplicate task name '{name}'")));
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.deps.push(Vec::new());
        self.dependents.push(Vec::new());
        self.edges.add_node(idx);
        Ok(idx)
    }

    /// Make `task` depend on `dep`. Rejects self-loops and edges that
    /// would close a cycle; adding an existing edge is a no-op.
    pub fn add_dependency(&mut self, task: usize, dep: usize) -> Result<()> {
        if dep == task {
            return Err(RigError::config(format!(
                "task '{}' cannot depend on itself",
                self.names[task]
            )));
        }
        if self.edges.contains_edge(dep, task) {
            return Ok(());
        }
        if has_path_connecting(&self.edges, task, dep, None) {
            return Err(RigError::config(format!(
                "dependency {} -> {} would create a cycle",
                self.names[dep], self.names[task]
            )));
        }

        self.edges.add_edge(dep, task, ());
        self.deps[task].push(dep);
        self.dependents[dep].push(task);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Direct dependencies of `idx`.
    pub fn dependencies_of(&self, idx: usize) -> &[usize] {
        &self.deps[idx]
    }

    /// Direct dependents of `idx`.
    pub fn dependents_of(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Nodes without dependencies, in registration order.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.deps[i].is_empty()).collect()
    }

    /// A topological order of every node.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        toposort(&self.edges, None).map_err(|cycle| {
            RigError::config(format!(
                "cycle detected in task graph involving task '{}'",
                self.names[cycle.node_id()]
            ))
        })
    }
}

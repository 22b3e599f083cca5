// src/dag/scheduler.rs

use std::collections::VecDeque;

use tracing::debug;

use crate::dag::graph::TaskGraph;
use crate::types::{PromotionPolicy, TaskStatus};

/// FIFO ready queue plus the promotion rule.
///
/// Every task enters the queue at most once: roots when seeded, every other
/// task when the last of its dependencies finishes and the promotion policy
/// accepts all of their statuses.
#[derive(Debug)]
pub struct Scheduler {
    queue: VecDeque<usize>,
    enqueued: Vec<bool>,
    /// Dependents still to be considered on completion; cleared per task once
    /// it finishes.
    pending_dependents: Vec<Option<Vec<usize>>>,
    policy: PromotionPolicy,
}

impl Scheduler {
    /// Seed the queue with every root of `graph`, in registration order.
    pub fn seed(graph: &TaskGraph, policy: PromotionPolicy) -> Self {
        let mut scheduler = Self {
            queue: VecDeque::new(),
            enqueued: vec![false; graph.len()],
            pending_dependents: (0..graph.len())
                .map(|i| Some(graph.dependents_of(i).to_vec()))
                .collect(),
            policy,
        };
        for root in graph.roots() {
            scheduler.enqueue(root);
        }
        debug!(ready = ?scheduler.queue, "seeded ready queue");
        scheduler
    }

    fn enqueue(&mut self, idx: usize) {
        if !self.enqueued[idx] {
            self.enqueued[idx] = true;
            self.queue.push_back(idx);
        }
    }

    /// Next ready task, if any.
    pub fn next(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    pub fn was_enqueued(&self, idx: usize) -> bool {
        self.enqueued[idx]
    }

    /// Record that `finished` left Running and promote its dependents.
    ///
    /// `status_of` reports the current status of any task. Returns the tasks
    /// newly enqueued, in dependent registration order.
    pub fn complete(
        &mut self,
        graph: &TaskGraph,
        finished: usize,
        status_of: impl Fn(usize) -> TaskStatus,
    ) -> Vec<usize> {
        let Some(dependents) = self.pending_dependents[finished].take() else {
            return Vec::new();
        };

        let mut promoted = Vec::new();
        for dependent in dependents {
            if self.enqueued[dependent] {
                continue;
            }
            let ready = graph
                .dependencies_of(dependent)
                .iter()
                .all(|&dep| self.policy.satisfied_by(status_of(dep)));
            if ready {
                self.enqueue(dependent);
                promoted.push(dependent);
            }
        }

        if !promoted.is_empty() {
            debug!(
                finished = graph.name(finished),
                promoted = ?promoted.iter().map(|&i| graph.name(i)).collect::<Vec<_>>(),
                "promoted dependents"
            );
        }
        promoted
    }
}

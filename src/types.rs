// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Lifecycle of a task inside one execution.
///
/// `Queued -> Running -> {Succeeded, Failed}`. There is no retry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// Succeeded or Failed.
    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// When a dependent may be promoted into the ready queue.
///
/// - `Terminal`: every dependency has left Queued/Running, whether it
///   succeeded or failed (default).
/// - `Succeeded`: every dependency succeeded. A failed dependency leaves its
///   dependents queued forever.
///
/// The difference only shows with a fail-action that does not halt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionPolicy {
    #[default]
    Terminal,
    Succeeded,
}

impl PromotionPolicy {
    pub fn satisfied_by(self, status: TaskStatus) -> bool {
        match self {
            PromotionPolicy::Terminal => status.is_done(),
            PromotionPolicy::Succeeded => status == TaskStatus::Succeeded,
        }
    }
}

impl FromStr for PromotionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terminal" => Ok(PromotionPolicy::Terminal),
            "succeeded" => Ok(PromotionPolicy::Succeeded),
            other => Err(format!(
                "invalid promotion policy: {other} (expected \"terminal\" or \"succeeded\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_promotion_is_the_default() {
        assert_eq!(PromotionPolicy::default(), PromotionPolicy::Terminal);
    }

    #[test]
    fn done_covers_both_terminal_states() {
        assert!(!TaskStatus::Queued.is_done());
        assert!(!TaskStatus::Running.is_done());
        assert!(TaskStatus::Succeeded.is_done());
        assert!(TaskStatus::Failed.is_done());
    }

    #[test]
    fn succeeded_policy_rejects_failed_dependency() {
        assert!(PromotionPolicy::Terminal.satisfied_by(TaskStatus::Failed));
        assert!(!PromotionPolicy::Succeeded.satisfied_by(TaskStatus::Failed));
        assert_eq!("Succeeded".parse::<PromotionPolicy>(), Ok(PromotionPolicy::Succeeded));
        assert!("sometimes".parse::<PromotionPolicy>().is_err());
    }
}

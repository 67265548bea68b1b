//! Task status and its transition rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Task.
///
/// Attempts move `Pending -> Running -> Done | Failed`. An attempt that fails
/// before the task is marked running goes straight `Pending -> Failed`. A
/// terminal task only becomes `Running` again through an explicit rerun.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task created, no attempt started yet.
    #[default]
    Pending,
    /// An attempt is executing.
    Running,
    /// The last attempt completed.
    Done,
    /// The last attempt timed out or errored.
    Failed,
}

impl TaskStatus {
    /// Returns true if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// `Done | Failed -> Running` is the rerun edge. `Pending -> Failed`
    /// records an attempt that never got started.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running | Self::Failed) => true,
            (Self::Running, Self::Done | Self::Failed) => true,
            (Self::Done | Self::Failed, Self::Running) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Done));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_rerun_edge() {
        assert!(TaskStatus::Done.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Failed.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_pending_can_fail_before_start() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Done));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Done.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Done));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }
}

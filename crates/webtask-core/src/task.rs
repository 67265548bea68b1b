//! Task type.

use crate::{CoreError, TaskId, TaskStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Task is one natural-language instruction for the browser agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// The user-supplied task text.
    pub title: String,

    /// Current task status.
    pub status: TaskStatus,

    /// Who created this task.
    pub owner: UserId,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,

    /// Number of attempts started against this task.
    pub attempts: u32,
}

impl Task {
    /// Create a new pending Task.
    pub fn new(title: impl Into<String>, owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            title: title.into(),
            status: TaskStatus::Pending,
            owner,
            created_at: now,
            updated_at: now,
            attempts: 0,
        }
    }

    /// Move the task to `next`, enforcing the status state machine.
    ///
    /// Entering `Running` counts as a new attempt.
    pub fn transition_to(&mut self, next: TaskStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        if next == TaskStatus::Running {
            self.attempts += 1;
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `user` owns this task.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("Buy milk", UserId::new("alice"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempts, 0);
        assert!(!task.is_terminal());
    }

    #[test]
    fn test_rerun_counts_attempts() {
        let mut task = Task::new("Buy milk", UserId::new("alice"));
        task.transition_to(TaskStatus::Running).unwrap();
        task.transition_to(TaskStatus::Failed).unwrap();
        task.transition_to(TaskStatus::Running).unwrap();
        assert_eq!(task.attempts, 2);
        assert_eq!(task.status, TaskStatus::Running);
    }

    #[test]
    fn test_invalid_transition_leaves_task_untouched() {
        let mut task = Task::new("Buy milk", UserId::new("alice"));
        let err = task.transition_to(TaskStatus::Done).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidStateTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Done
            }
        );
        assert_eq!(task.status, TaskStatus::Pending);
    }
}

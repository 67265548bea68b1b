//! Task persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use webtask_core::{CoreError, Task, TaskId, TaskStatus, UserId};

/// Task store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable record of tasks and their status.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, title: &str, owner: &UserId) -> Result<Task, StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Move a task to `status`. `Ok(None)` when the task does not exist.
    async fn set_status(&self, id: &TaskId, status: TaskStatus)
        -> Result<Option<Task>, StoreError>;

    /// Delete a task owned by `owner`. Returns false when absent or not owned.
    async fn delete_task(&self, id: &TaskId, owner: &UserId) -> Result<bool, StoreError>;

    /// Tasks owned by `owner`, newest first.
    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// Process-local [`TaskStore`].
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, title: &str, owner: &UserId) -> Result<Task, StoreError> {
        let task = Task::new(title, owner.clone());
        self.tasks.write().await.insert(task.id.clone(), task.clone());
        debug!(task_id = %task.id, owner = %owner, "Task stored");
        Ok(task)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn set_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            return Ok(None);
        };
        task.transition_to(status)?;
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: &TaskId, owner: &UserId) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(id) {
            Some(task) if task.is_owned_by(owner) => {
                tasks.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.tasks.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryTaskStore::new();
        let owner = UserId::new("alice");

        let task = store.create_task("Buy milk", &owner).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let fetched = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_status_validates_transitions() {
        let store = InMemoryTaskStore::new();
        let task = store
            .create_task("Buy milk", &UserId::new("alice"))
            .await
            .unwrap();

        let err = store
            .set_status(&task.id, TaskStatus::Done)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InvalidStateTransition { .. })
        ));

        let running = store
            .set_status(&task.id, TaskStatus::Running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(running.attempts, 1);
    }

    #[tokio::test]
    async fn test_set_status_missing_task() {
        let store = InMemoryTaskStore::new();
        let result = store
            .set_status(&TaskId::new("missing"), TaskStatus::Running)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let store = InMemoryTaskStore::new();
        let alice = UserId::new("alice");
        let task = store.create_task("Buy milk", &alice).await.unwrap();

        assert!(!store.delete_task(&task.id, &UserId::new("bob")).await.unwrap());
        assert!(store.delete_task(&task.id, &alice).await.unwrap());
        assert!(!store.delete_task(&task.id, &alice).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_tasks_filters_by_owner() {
        let store = InMemoryTaskStore::new();
        let alice = UserId::new("alice");
        store.create_task("one", &alice).await.unwrap();
        store.create_task("two", &alice).await.unwrap();
        store.create_task("other", &UserId::new("bob")).await.unwrap();

        let tasks = store.list_tasks(&alice).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.is_owned_by(&alice)));
    }
}

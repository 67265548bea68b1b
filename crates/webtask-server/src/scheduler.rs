//! Task scheduler - single-flight admission and background dispatch.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use webtask_core::{LogEntry, Task, TaskId, TaskStatus, UserId};

use crate::activity::ActivityLog;
use crate::pipeline::AgentExecutionPipeline;
use crate::run_flag::{RunFlag, RunLease};
use crate::store::{StoreError, TaskStore};

/// Scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("A task is already running")]
    Busy,

    #[error("No task is running")]
    NothingRunning,

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// HTTP status for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Busy | Self::NothingRunning | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::TaskNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An attempt was admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub task_id: TaskId,
}

/// A stop request was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopAck {
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub task_id: Option<TaskId>,
}

/// Task scheduler.
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    log: Arc<ActivityLog>,
    flag: Arc<RunFlag>,
    pipeline: Arc<AgentExecutionPipeline>,
    /// Spawned workers that have not finished yet.
    workers: Arc<watch::Sender<usize>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn TaskStore>,
        log: Arc<ActivityLog>,
        pipeline: Arc<AgentExecutionPipeline>,
    ) -> Self {
        let (workers, _) = watch::channel(0);
        Self {
            store,
            log,
            flag: Arc::new(RunFlag::new()),
            pipeline,
            workers: Arc::new(workers),
        }
    }

    /// Create a task and start an attempt for it.
    ///
    /// Rejected with [`SchedulerError::Busy`] while an attempt holds the
    /// run flag; no task is created in that case.
    pub async fn submit(
        &self,
        owner: &UserId,
        description: &str,
    ) -> Result<Accepted, SchedulerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(SchedulerError::InvalidInput(
                "task_text is required".to_string(),
            ));
        }

        let lease = self.flag.try_acquire().ok_or(SchedulerError::Busy)?;
        let task = self.store.create_task(description, owner).await?;
        lease.bind(task.id.clone());
        self.log
            .add(format!("Task created: {description} (ID: {})", task.id))
            .await;

        self.dispatch(lease, task.id.clone(), description.to_string());
        Ok(Accepted { task_id: task.id })
    }

    /// Clear the run flag and signal the attempt to stop.
    ///
    /// Cooperative: the attempt notices at its next checkpoint or when its
    /// timeout elapses.
    pub async fn request_stop(&self) -> Result<StopAck, SchedulerError> {
        let task_id = self
            .flag
            .request_stop()
            .ok_or(SchedulerError::NothingRunning)?;
        match &task_id {
            Some(id) => self.log.task(id, "stop requested").await,
            None => self.log.add("Stop requested").await,
        }
        Ok(StopAck { task_id })
    }

    /// Start a fresh attempt for an existing task.
    pub async fn rerun(
        &self,
        owner: &UserId,
        task_id: &TaskId,
    ) -> Result<Accepted, SchedulerError> {
        let lease = self.flag.try_acquire().ok_or(SchedulerError::Busy)?;

        let task = match self.owned_task(owner, task_id).await {
            Ok(task) => task,
            Err(e) => {
                self.log
                    .add(format!("Rerun failed: not found or not owned (task_id={task_id})"))
                    .await;
                return Err(e);
            }
        };
        // A stopped attempt may still be winding down on this task.
        if task.status == TaskStatus::Running {
            return Err(SchedulerError::Busy);
        }

        self.store
            .set_status(task_id, TaskStatus::Running)
            .await?
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.clone()))?;
        lease.bind(task_id.clone());
        self.log
            .add(format!("Task rerun: {} (ID: {})", task.title, task.id))
            .await;

        self.dispatch(lease, task.id, task.title);
        Ok(Accepted {
            task_id: task_id.clone(),
        })
    }

    /// Delete a task. The task of an in-flight attempt cannot be deleted.
    pub async fn delete_task(&self, owner: &UserId, task_id: &TaskId) -> Result<(), SchedulerError> {
        let task = match self.owned_task(owner, task_id).await {
            Ok(task) => task,
            Err(e) => {
                self.log
                    .add(format!("Delete failed: not found or not owned (task_id={task_id})"))
                    .await;
                return Err(e);
            }
        };
        if task.status == TaskStatus::Running || self.flag.active_task().as_ref() == Some(task_id)
        {
            return Err(SchedulerError::Busy);
        }

        if !self.store.delete_task(task_id, owner).await? {
            return Err(SchedulerError::TaskNotFound(task_id.clone()));
        }
        self.log.add(format!("Task deleted (task_id={task_id})")).await;
        Ok(())
    }

    pub async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, SchedulerError> {
        Ok(self.store.list_tasks(owner).await?)
    }

    pub async fn list_recent_log(&self) -> Vec<LogEntry> {
        self.log.snapshot().await
    }

    pub async fn clear_log(&self) {
        self.log.clear().await;
        info!("Activity log cleared");
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.flag.is_running(),
            task_id: self.flag.active_task(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.flag.is_running()
    }

    /// Resolve once every spawned worker has finished, including stopped
    /// ones that are still winding down.
    pub async fn wait_idle(&self) {
        let mut rx = self.workers.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    async fn owned_task(&self, owner: &UserId, task_id: &TaskId) -> Result<Task, SchedulerError> {
        self.store
            .get_task(task_id)
            .await?
            .filter(|task| task.is_owned_by(owner))
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.clone()))
    }

    fn dispatch(&self, lease: RunLease, task_id: TaskId, description: String) {
        info!(task_id = %task_id, generation = lease.generation(), "Dispatching attempt");
        self.workers.send_modify(|n| *n += 1);

        let pipeline = self.pipeline.clone();
        let worker_task_id = task_id.clone();
        let handle =
            tokio::spawn(async move { pipeline.run(lease, worker_task_id, description).await });

        // The pipeline contains every error; only a panic reaches this point,
        // and the lease has already been released while unwinding.
        let store = self.store.clone();
        let log = self.log.clone();
        let workers = self.workers.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(task_id = %task_id, error = %e, "Attempt worker aborted");
                if let Err(err) = store.set_status(&task_id, TaskStatus::Failed).await {
                    warn!(task_id = %task_id, error = %err, "Failed to record final status");
                }
                log.task(&task_id, format!("status → failed ({e})")).await;
                log.task(&task_id, "agent state reset").await;
            }
            workers.send_modify(|n| *n -= 1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SchedulerError::Busy.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SchedulerError::NothingRunning.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SchedulerError::InvalidInput("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SchedulerError::TaskNotFound(TaskId::new("t")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SchedulerError::Store(StoreError::Backend("down".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

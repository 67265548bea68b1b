//! Task handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use webtask_core::TaskId;

use crate::auth::AuthUser;
use crate::http::responses::{
    ApiError, MessageResponse, RunTaskRequest, TaskResponse, TaskStartedResponse,
};
use crate::scheduler::SchedulerStatus;
use crate::state::AppState;

/// Submit a new task.
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<RunTaskRequest>,
) -> Result<(StatusCode, Json<TaskStartedResponse>), ApiError> {
    let accepted = state.scheduler.submit(&user, &request.task_text).await?;
    info!(user = %user, task_id = %accepted.task_id, "Task submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskStartedResponse {
            message: "Task started".to_string(),
            task_id: accepted.task_id.into_inner(),
        }),
    ))
}

/// Ask the running attempt to stop.
pub async fn stop_task(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.scheduler.request_stop().await?;
    Ok(Json(MessageResponse::new("Task stopped")))
}

/// Start a new attempt for an existing task.
pub async fn rerun_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<(StatusCode, Json<TaskStartedResponse>), ApiError> {
    let accepted = state
        .scheduler
        .rerun(&user, &TaskId::new(task_id))
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskStartedResponse {
            message: "Task restarted".to_string(),
            task_id: accepted.task_id.into_inner(),
        }),
    ))
}

/// List the caller's tasks.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state.scheduler.list_tasks(&user).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .scheduler
        .delete_task(&user, &TaskId::new(task_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

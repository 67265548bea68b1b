//! HTTP API.
//!
//! Provides endpoints for:
//! - Task submission, stop and rerun (`/api/run_task`, `/api/stop_task`, `/api/tasks/:id/rerun`)
//! - Task list and delete (`/api/tasks`, `/api/tasks/:id`)
//! - Run status (`/api/status`)
//! - Activity log (`/api/logs`, `/api/clear_history`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/run_task", post(handlers::run_task))
        .route("/stop_task", post(handlers::stop_task))
        .route("/tasks", get(handlers::list_tasks))
        .route("/tasks/:id", delete(handlers::delete_task))
        .route("/tasks/:id/rerun", post(handlers::rerun_task))
        .route("/status", get(handlers::status))
        .route("/logs", get(handlers::list_logs))
        .route("/clear_history", post(handlers::clear_history));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

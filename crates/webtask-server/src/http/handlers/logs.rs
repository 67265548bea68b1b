//! Activity log handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::http::responses::MessageResponse;
use crate::state::AppState;

/// Rendered log lines, oldest first.
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Json<Vec<String>> {
    let entries = state.scheduler.list_recent_log().await;
    Json(entries.iter().map(ToString::to_string).collect())
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Json<MessageResponse> {
    state.scheduler.clear_log().await;
    Json(MessageResponse::new("History cleared"))
}

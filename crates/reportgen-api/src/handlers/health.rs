use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::router::ApiState;

pub async fn health_live() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<ApiState>) -> impl IntoResponse {
    if state.scheduler.is_running() {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "activeJobs": state.scheduler.active_tasks().await })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "dispatcher stopped" })),
        )
    }
}

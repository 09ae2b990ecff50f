use crate::errors::ApiError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use background_service::{PipelineKind, RunReport, RunStatus};
use serde_json::{json, Value};

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn trigger(state: &AppState, kind: PipelineKind) -> (StatusCode, Json<RunReport>) {
    let report = state.orchestrator.run(kind).await;
    let status = match report.status {
        RunStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        RunStatus::Success | RunStatus::PartialFailure => StatusCode::OK,
    };
    (status, Json(report))
}

/// POST /trigger/reddit
pub async fn trigger_reddit(State(state): State<AppState>) -> (StatusCode, Json<RunReport>) {
    trigger(&state, PipelineKind::Reddit).await
}

/// POST /trigger/reddit/backfill
pub async fn trigger_backfill(State(state): State<AppState>) -> (StatusCode, Json<RunReport>) {
    trigger(&state, PipelineKind::RedditBackfill).await
}

/// POST /trigger/blog
pub async fn trigger_blog(State(state): State<AppState>) -> (StatusCode, Json<RunReport>) {
    trigger(&state, PipelineKind::Blog).await
}

/// POST /trigger/social
pub async fn trigger_social(State(state): State<AppState>) -> (StatusCode, Json<RunReport>) {
    trigger(&state, PipelineKind::Social).await
}

/// POST /trigger/all
pub async fn trigger_all(State(state): State<AppState>) -> (StatusCode, Json<RunReport>) {
    trigger(&state, PipelineKind::All).await
}

/// POST /cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let removed = state.orchestrator.clear_cache().await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Cleared {} seen post ids", removed),
    })))
}

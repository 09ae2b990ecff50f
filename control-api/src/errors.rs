use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use outreach_core::{CoreError, ErrorExt};
use serde_json::json;
use thiserror::Error;

/// Errors a handler can return. Rendered as `{status, code, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Core(e) = &self;
        e.log_error();

        let body = Json(json!({
            "status": "error",
            "code": e.error_code(),
            "message": e.user_friendly_message(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

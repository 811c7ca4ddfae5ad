use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The JSON envelope of every `/api/send` response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<E = ()> {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<E>,
}

impl ApiResponse {
    pub fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
            errors: None,
        }
    }

    pub fn failure(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            errors: None,
        }
    }
}

pub fn internal_server_error(err: impl Into<anyhow::Error>) -> Response {
    let err = err.into();
    tracing::error!("internal server error: {err:#}");
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub fn error(code: StatusCode, message: &'static str) -> Response {
    (code, Json(ApiResponse::failure(message))).into_response()
}

pub async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not found")
}

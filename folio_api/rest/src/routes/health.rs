use axum::{routing, Json, Router};
use serde::Serialize;

use crate::errors::not_found;

pub fn router() -> Router<()> {
    Router::new().route("/api/health", routing::get(health).fallback(not_found))
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

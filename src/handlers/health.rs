use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check OK"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "store": backend.as_str()
            })),
        ),
        Err(e) => {
            tracing::warn!(store = %backend, error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "store": backend.as_str(),
                    "error": e.to_string()
                })),
            )
        }
    }
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    storage: &'a str,
    cache: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Warden",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

/// Reports 503 while the database or the cache cannot be reached.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let storage_ok = state.storage.is_healthy();
    let cache_ok = state.cache.is_available().await;

    let status = if storage_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = |ok: bool| if ok { "up" } else { "down" };

    (
        status,
        Json(HealthResponse {
            status: if status.is_success() { "ok" } else { "degraded" },
            storage: label(storage_ok),
            cache: label(cache_ok),
        }),
    )
}

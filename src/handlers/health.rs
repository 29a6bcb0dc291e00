//! Health check handlers

use axum::{extract::State, Json};

use crate::db;
use crate::state::AppState;

/// Health check response
#[derive(serde::Serialize)]
pub struct HealthResponse {
    status: String,
    database: String,
    cache: String,
    version: String,
}

/// GET / - API banner
pub async fn root() -> &'static str {
    "MarketLens API Server"
}

/// GET /health - Database and cache connectivity probe
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match db::check_health(state.users.pool()).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    // A down cache degrades the service but does not make it unhealthy;
    // authentication works on token signatures alone.
    let cache = if state.sessions.is_healthy().await {
        "connected".to_string()
    } else {
        "unreachable".to_string()
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        cache,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

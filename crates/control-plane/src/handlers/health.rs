//! Health check endpoints for the Signoff Control Plane API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::pool::health_check as db_health_check;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status ("ok" or "unhealthy")
    pub status: String,
}

/// Detailed health check response for the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Basic liveness check.
///
/// `GET /health`
pub async fn health_check() -> (StatusCode, Json<HealthCheckResponse>) {
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Detailed health check including database connectivity.
///
/// `GET /api/health`
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let (status_code, status, database) = if db_health_check(&state.db).await {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "unreachable")
    };

    (
        status_code,
        Json(ApiHealthResponse {
            status: status.to_string(),
            database: Some(database.to_string()),
            uptime_seconds: Some(state.uptime_seconds()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    )
}

//! Health check endpoint

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use crate::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub cache_enabled: bool,
    pub cache: bool,
    pub issues: Vec<String>,
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.services.health_check().await;
    let code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let status = match (report.is_healthy(), report.get_issues().is_empty()) {
        (true, true) => "ok",
        (true, false) => "degraded",
        (false, _) => "unavailable",
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database: report.database_healthy,
            cache_enabled: report.cache_enabled,
            cache: report.cache_healthy,
            issues: report.get_issues(),
        }),
    )
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

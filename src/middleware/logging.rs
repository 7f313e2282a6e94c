//! Request logging middleware
//!
//! Logs method, path, status and latency for every request and warns when a
//! request takes longer than the configured slow threshold.

use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::http::StatusCode;
use tracing::{info, warn, error};
use crate::server::AppState;

/// How a finished request should be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLevel {
    Normal,
    Slow,
    Failed,
}

/// Classify a finished request
pub fn classify(status: StatusCode, elapsed: Duration, slow_threshold: Duration) -> RequestLevel {
    if status.is_server_error() {
        RequestLevel::Failed
    } else if elapsed >= slow_threshold {
        RequestLevel::Slow
    } else {
        RequestLevel::Normal
    }
}

/// axum middleware; install with `middleware::from_fn_with_state`
pub async fn log_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let duration_ms = elapsed.as_millis() as u64;
    let slow_threshold = Duration::from_millis(state.settings.logging.slow_request_ms);

    match classify(status, elapsed, slow_threshold) {
        RequestLevel::Failed => error!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            "Request failed"
        ),
        RequestLevel::Slow => warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            threshold_ms = state.settings.logging.slow_request_ms,
            "Slow request"
        ),
        RequestLevel::Normal => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            "Request completed"
        ),
    }

    response
}

//! HTTP server setup
//!
//! Builds the axum router with CORS, body limit, request logging and
//! tracing layers, serves uploaded photos and shuts down gracefully on
//! Ctrl+C or SIGTERM.

use std::sync::Arc;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, error};
use crate::config::Settings;
use crate::handlers;
use crate::middleware::logging::log_requests;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub services: ServiceFactory,
}

impl AppState {
    pub fn new(settings: Settings, services: ServiceFactory) -> Self {
        Self { settings, services }
    }
}

/// CORS layer for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        warn!("CORS: all origins allowed");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The complete application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.settings.uploads.dir);
    let max_body_bytes = state.settings.server.max_body_bytes;

    // Outermost first. The request log sees the plain `Body`, so it must
    // sit outside the body limit, which rewraps it.
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.server.cors_origins))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    handlers::api_router()
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(layers)
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives
pub async fn run(settings: Settings, services: ServiceFactory) -> Result<()> {
    let address = settings.bind_address();
    let state = Arc::new(AppState::new(settings, services));
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

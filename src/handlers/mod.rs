//! HTTP handlers module
//!
//! Each submodule exposes a `router()` with its routes; `server` merges them:
//! - Health check
//! - Account registration, verification and login
//! - Public event gallery and albums
//! - Content submission and owner management
//! - Moderation and administration
//! - Payment stub

pub mod admin;
pub mod auth;
pub mod content;
pub mod events;
pub mod health;
pub mod payments;

use std::sync::Arc;
use axum::Router;
use crate::server::AppState;

/// All API routes, without state or layers
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(events::router())
        .merge(content::router())
        .merge(admin::router())
        .merge(payments::router())
}

//! Alumni association portal
//!
//! HTTP API for an alumni community: accounts with OTP email verification
//! and a role hierarchy, moderated galleries of events, reunions, videos and
//! general posts with photo uploads, event albums and a payment stub.

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;
pub mod middleware;
pub mod server;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{PortalError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
pub use server::{build_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}

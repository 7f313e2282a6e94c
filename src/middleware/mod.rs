//! Middleware module
//!
//! This module contains request extractors and middleware for the HTTP layer

pub mod auth;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::{Authorized, CurrentUser, MinRole};
pub use rate_limit::{RateLimitConfig, RateLimiter};

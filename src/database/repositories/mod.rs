//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod content;
pub mod transaction;

// Re-export repositories
pub use user::UserRepository;
pub use content::{ContentRepository, NewContent};
pub use transaction::{TransactionRepository, NewTransaction};

//! Test helpers module
//!
//! This module provides utilities and helpers for testing the alumni portal.
//! It includes database helpers, test data builders and a router test context.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;

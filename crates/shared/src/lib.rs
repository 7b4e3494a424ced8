// Shared crate clippy configuration
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Shared infrastructure for the planner services.
//!
//! Holds the pieces that are not specific to one binary: database pool
//! construction, schema migrations, and the authentication rate limiter.

pub mod db;
pub mod rate_limit;

pub use db::{create_pool, run_migrations};
pub use rate_limit::{AttemptStore, MemoryAttemptStore, RateLimiter};

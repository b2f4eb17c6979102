//! # Middleware
//!
//! Tower middleware layers for the API: request metrics and per-caller
//! rate limiting. Authentication lives in [`crate::auth`].

pub mod metrics;
pub mod rate_limit;

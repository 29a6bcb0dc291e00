//! Middleware for the MarketLens API
//!
//! This module provides middleware for request tracing, rate limiting,
//! security headers, and authentication.

pub mod auth;
mod http_tracing;
mod rate_limit;
mod security;

pub use auth::{ActiveUser, CurrentUser, PrivilegedUser};
pub use http_tracing::request_tracing;
pub use rate_limit::{rate_limit_layer, RateLimiter};
pub use security::security_headers;

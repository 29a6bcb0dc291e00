//! Route definitions for the MarketLens API

mod auth;

pub use auth::auth_routes;

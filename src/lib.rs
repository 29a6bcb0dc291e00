//! MarketLens Backend Library
//!
//! This library exports the core modules for the MarketLens backend server:
//! authentication and session lifecycle, the Redis session store, user
//! persistence, and the HTTP surface.

pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod users;

//! API handlers for the MarketLens backend

pub mod auth;
pub mod health;

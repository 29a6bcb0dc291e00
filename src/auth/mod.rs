//! Authentication module for MarketLens
//!
//! Password-based authentication with a dual-token session model:
//! - Argon2 credential hashing and verification
//! - Signed, purpose-tagged access / refresh / password-reset tokens
//! - Session lifecycle orchestration over the Redis session store

mod password;
mod service;
mod token;

pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthError, AuthService};
pub use token::{Claims, TokenCodec, TokenError, TokenPurpose};

//! Authentication service
//!
//! Core business logic for the session lifecycle: registration, login,
//! refresh-token rotation, logout, and password reset. Token verification is
//! always authoritative; the session store only adds revocation and lookup
//! speed, and its failures never abort an otherwise-valid operation.

use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::User;
use crate::session::{CacheRead, SessionStore};
use crate::users::{UserRepository, UserRepositoryError};

use super::password::{hash_password, verify_password, PasswordError};
use super::token::{TokenCodec, TokenError, TokenPurpose};

const MIN_PASSWORD_LEN: usize = 8;

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email and wrong password collapse into this one variant so
    /// responses cannot be used for account enumeration.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters long")]
    WeakPassword,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Refresh token no longer matches the recorded session (already rotated
    /// away, or the session was revoked).
    #[error("Refresh token has been revoked or superseded")]
    RevokedOrInvalid,

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("User not found")]
    NotFound,

    #[error("Password hashing error: {0}")]
    Password(PasswordError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<UserRepositoryError> for AuthError {
    fn from(e: UserRepositoryError) -> Self {
        match e {
            UserRepositoryError::DuplicateEmail => AuthError::DuplicateEmail,
            UserRepositoryError::Database(e) => AuthError::Database(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Incorrect email or password".to_string())
            }
            AuthError::AccountInactive => ApiError::Forbidden("Account is inactive".to_string()),
            AuthError::DuplicateEmail => {
                ApiError::BadRequest("Email already registered".to_string())
            }
            AuthError::WeakPassword => ApiError::BadRequest(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )),
            // Signing is our failure, not the client's.
            AuthError::Token(TokenError::EncodingFailed(reason)) => {
                tracing::error!(error = %reason, "Token signing failed");
                ApiError::InternalError("Token signing failed".to_string())
            }
            // All verification failures look identical to clients; the
            // distinction stays in the logs.
            AuthError::Token(e) => {
                tracing::debug!(error = %e, "Token verification failed");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            AuthError::RevokedOrInvalid | AuthError::Unauthorized => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            AuthError::NotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::Password(e) => ApiError::InternalError(e.to_string()),
            AuthError::Database(e) => ApiError::from(e),
        }
    }
}

/// Authentication service
pub struct AuthService {
    users: UserRepository,
    codec: Arc<TokenCodec>,
    sessions: SessionStore,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        codec: Arc<TokenCodec>,
        sessions: SessionStore,
        config: &Config,
    ) -> Self {
        Self {
            users,
            codec,
            sessions,
            access_ttl_seconds: config.access_token_ttl_seconds.max(0) as u64,
            refresh_ttl_seconds: (config.refresh_token_ttl_days.max(0) as u64) * 24 * 60 * 60,
        }
    }

    /// Register a new user account.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let hashed = hash_password(password).map_err(AuthError::Password)?;
        let user = self.users.insert(email, full_name, &hashed).await?;

        tracing::info!(user_id = user.id, "Registered new user");
        Ok(user)
    }

    /// Authenticate and issue an access/refresh token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, String), AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match verify_password(password, &user.hashed_password) {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                // A hash we cannot parse can never verify. Recoverable.
                tracing::warn!(user_id = user.id, error = %e, "Stored password hash unreadable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        self.issue_session(&user).await
    }

    /// Rotate a refresh token into a fresh access/refresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, String), AuthError> {
        let claims = self.codec.verify(refresh_token, TokenPurpose::Refresh)?;

        // Cross-check the reverse mapping: a refresh token that was already
        // rotated away no longer maps to its subject. The check fails open
        // when the store is down; the signature remains the authority then.
        match self.sessions.refresh_owner(refresh_token).await {
            CacheRead::Hit(owner) if owner == claims.sub => {}
            CacheRead::Hit(_) | CacheRead::Miss => return Err(AuthError::RevokedOrInvalid),
            CacheRead::Unavailable => {
                tracing::warn!("Session store unreachable; accepting refresh token on signature alone");
            }
        }

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !user.is_active {
            return Err(AuthError::Unauthorized);
        }

        let pair = self.issue_session(&user).await?;

        // The old token's reverse mapping dies with the rotation; from here
        // on only the pair just issued can pass the ownership check. A
        // refresh within the same clock second reissues the identical token
        // string, and that mapping must survive.
        if pair.1 != refresh_token
            && self
                .sessions
                .forget_refresh_owner(refresh_token)
                .await
                .is_degraded()
        {
            tracing::warn!(user_id = user.id, "Rotated refresh mapping not cleared; it expires naturally");
        }

        Ok(pair)
    }

    /// Revoke the current session. Idempotent: revoking an expired or
    /// already-revoked token is not an error.
    pub async fn logout(&self, user: &User, access_token: &str) -> Result<(), AuthError> {
        let remaining = self
            .codec
            .verify(access_token, TokenPurpose::Access)
            .ok()
            .and_then(|claims| TokenCodec::remaining_ttl(&claims));

        let write = self
            .sessions
            .revoke(user.id, &user.email, access_token, remaining)
            .await;
        if write.is_degraded() {
            tracing::warn!(user_id = user.id, "Logout revocation degraded; token expires naturally");
        }

        tracing::info!(user_id = user.id, "User logged out");
        Ok(())
    }

    /// Issue a password-reset token for the given email.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(self.codec.issue(&user.email, TokenPurpose::PasswordReset)?)
    }

    /// Replace the password using a valid reset token.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let claims = self.codec.verify(token, TokenPurpose::PasswordReset)?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        let hashed = hash_password(new_password).map_err(AuthError::Password)?;
        self.users.update_password_hash(user.id, &hashed).await?;

        // Stale snapshots would keep authenticating requests against the
        // old hash view; force a reload.
        let write = self.sessions.invalidate_user(&user.email).await;
        if write.is_degraded() {
            tracing::warn!(user_id = user.id, "Cached profile invalidation degraded after reset");
        }

        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(())
    }

    /// Issue a token pair and record the session, best-effort.
    async fn issue_session(&self, user: &User) -> Result<(String, String), AuthError> {
        let access_token = self.codec.issue(&user.email, TokenPurpose::Access)?;
        let refresh_token = self.codec.issue(&user.email, TokenPurpose::Refresh)?;

        let write = self
            .sessions
            .remember_session(
                user.id,
                &user.email,
                &access_token,
                &refresh_token,
                self.access_ttl_seconds,
                self.refresh_ttl_seconds,
            )
            .await;
        if write.is_degraded() {
            // Token verification is the authority; login still succeeds.
            tracing::warn!(user_id = user.id, "Session not fully recorded in cache");
        }

        Ok((access_token, refresh_token))
    }
}

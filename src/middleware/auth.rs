//! Authentication middleware
//!
//! Per-request guard that resolves a bearer token to a user. Revocation is
//! checked first against the session store (fail-open when the store is
//! down), then the token signature decides, then the user is loaded through
//! the profile cache with a database fallback.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{TokenCodec, TokenPurpose};
use crate::error::ApiError;
use crate::models::User;
use crate::session::{CacheRead, SessionStore};
use crate::users::UserRepository;

/// Authenticated user resolved from a bearer token.
///
/// Keeps the raw token so logout can blacklist it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

fn unauthorized(message: &str) -> Response {
    ApiError::Unauthorized(message.to_string()).into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<TokenCodec>: FromRef<S>,
    SessionStore: FromRef<S>,
    UserRepository: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| unauthorized("Authorization header with Bearer token required"))?;
        let token = bearer.token();

        let codec = Arc::<TokenCodec>::from_ref(state);
        let sessions = SessionStore::from_ref(state);
        let users = UserRepository::from_ref(state);

        // Revocation first; a blacklisted token is dead even though its
        // signature still verifies.
        match sessions.is_blacklisted(token).await {
            CacheRead::Hit(()) => return Err(unauthorized("Token has been revoked")),
            CacheRead::Miss => {}
            CacheRead::Unavailable => {
                // Fail open: availability over revocation when the store is
                // down. The warning is the operator's signal.
                tracing::warn!("Blacklist unavailable; proceeding on token signature alone");
            }
        }

        let claims = codec
            .verify(token, TokenPurpose::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                unauthorized("Invalid or expired token")
            })?;

        let email = claims.sub;
        if email.is_empty() {
            return Err(unauthorized("Could not validate credentials"));
        }

        // Cache-hit fast path avoids the database round trip.
        if let CacheRead::Hit(user) = sessions.lookup_cached_user(&email).await {
            return Ok(CurrentUser {
                user,
                token: token.to_string(),
            });
        }

        let user = users
            .find_by_email(&email)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()).into_response())?
            .ok_or_else(|| unauthorized("User not found"))?;

        let _write = sessions.cache_user(&user).await;

        Ok(CurrentUser {
            user,
            token: token.to_string(),
        })
    }
}

/// Guard requiring the authenticated user to be active.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for ActiveUser
where
    Arc<TokenCodec>: FromRef<S>,
    SessionStore: FromRef<S>,
    UserRepository: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if !current.user.is_active {
            return Err(ApiError::Forbidden("Account is inactive".to_string()).into_response());
        }

        Ok(ActiveUser(current))
    }
}

/// Guard requiring superuser privileges.
#[derive(Debug, Clone)]
pub struct PrivilegedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for PrivilegedUser
where
    Arc<TokenCodec>: FromRef<S>,
    SessionStore: FromRef<S>,
    UserRepository: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if !current.user.is_superuser {
            return Err(ApiError::Forbidden("Not enough privileges".to_string()).into_response());
        }

        Ok(PrivilegedUser(current))
    }
}

//! Session store over Redis
//!
//! Records active and blacklisted tokens plus a short-lived user-profile
//! cache. The store is advisory, not authoritative: cryptographic token
//! verification always decides validity, and every operation here degrades
//! gracefully when the backend is unreachable. Degradation is a typed
//! result, not a swallowed exception, so each call site states its own
//! fail-open or fail-closed policy.
//!
//! The store runs over the [`SessionBackend`] key-value contract; Redis is
//! the production backend, and anything honoring get/set-with-ttl/delete
//! semantics is substitutable.

pub mod keys;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use thiserror::Error;

use crate::models::User;

/// Raw failure reported by a session backend.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Key-value contract the session store runs on.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl SessionBackend for ConnectionManager {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.clone();
        let value: Option<String> = AsyncCommands::get(&mut conn, key)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.clone();
        let _: () = AsyncCommands::set_ex(&mut conn, key, value, ttl_seconds)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.clone();
        let _: () = AsyncCommands::del(&mut conn, key)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.clone();
        let found: bool = AsyncCommands::exists(&mut conn, key)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(found)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| StoreError(e.to_string()))
    }
}

/// Outcome of a best-effort cache read.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheRead<T> {
    /// The key exists and was read.
    Hit(T),
    /// The key does not exist.
    Miss,
    /// The cache could not answer; the caller chooses the policy.
    Unavailable,
}

/// Outcome of a best-effort cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CacheWrite {
    Applied,
    Degraded,
}

impl CacheWrite {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CacheWrite::Degraded)
    }
}

/// Session store over a key-value backend.
///
/// Cheap to clone. The production backend is a Redis `ConnectionManager`,
/// which multiplexes one connection and reconnects on its own.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    user_cache_ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(conn: ConnectionManager, user_cache_ttl_seconds: u64) -> Self {
        Self::with_backend(Arc::new(conn), user_cache_ttl_seconds)
    }

    /// Build over any backend honoring the key-value contract.
    pub fn with_backend(backend: Arc<dyn SessionBackend>, user_cache_ttl_seconds: u64) -> Self {
        Self {
            backend,
            user_cache_ttl_seconds,
        }
    }

    /// Record the active token pair for a user, with expirations mirroring
    /// the token lifetimes. Best-effort: authentication has already
    /// succeeded by the time this runs.
    pub async fn remember_session(
        &self,
        user_id: i64,
        email: &str,
        access_token: &str,
        refresh_token: &str,
        access_ttl_seconds: u64,
        refresh_ttl_seconds: u64,
    ) -> CacheWrite {
        let entries = [
            (keys::access_token(user_id), access_token, access_ttl_seconds),
            (
                keys::refresh_token(user_id),
                refresh_token,
                refresh_ttl_seconds,
            ),
            (
                keys::refresh_token_user(refresh_token),
                email,
                refresh_ttl_seconds,
            ),
        ];

        let mut outcome = CacheWrite::Applied;
        for (key, value, ttl) in entries {
            if self.set_ex(&key, value, ttl).await.is_degraded() {
                outcome = CacheWrite::Degraded;
            }
        }
        outcome
    }

    /// Check whether a token carries a revocation marker.
    pub async fn is_blacklisted(&self, token: &str) -> CacheRead<()> {
        match self.backend.exists(&keys::blacklist(token)).await {
            Ok(true) => CacheRead::Hit(()),
            Ok(false) => CacheRead::Miss,
            Err(e) => {
                tracing::warn!(error = %e, "Session store unreachable during blacklist check");
                CacheRead::Unavailable
            }
        }
    }

    /// Revoke a session: blacklist the access token for its remaining
    /// lifetime and drop the session entries and profile snapshot, including
    /// the refresh token's reverse mapping.
    pub async fn revoke(
        &self,
        user_id: i64,
        email: &str,
        access_token: &str,
        remaining_ttl_seconds: Option<u64>,
    ) -> CacheWrite {
        let mut outcome = CacheWrite::Applied;

        // An already-expired token needs no marker; the codec rejects it.
        if let Some(ttl) = remaining_ttl_seconds {
            if self
                .set_ex(&keys::blacklist(access_token), "revoked", ttl)
                .await
                .is_degraded()
            {
                outcome = CacheWrite::Degraded;
            }
        }

        // The reverse mapping is keyed by token value; resolve it through
        // the forward key before dropping both.
        match self.get(&keys::refresh_token(user_id)).await {
            CacheRead::Hit(refresh_token) => {
                if self
                    .delete(&keys::refresh_token_user(&refresh_token))
                    .await
                    .is_degraded()
                {
                    outcome = CacheWrite::Degraded;
                }
            }
            CacheRead::Miss => {}
            CacheRead::Unavailable => outcome = CacheWrite::Degraded,
        }

        for key in [
            keys::access_token(user_id),
            keys::refresh_token(user_id),
            keys::user(email),
        ] {
            if self.delete(&key).await.is_degraded() {
                outcome = CacheWrite::Degraded;
            }
        }

        outcome
    }

    /// Look up which user a refresh token was issued to (rotation check).
    pub async fn refresh_owner(&self, refresh_token: &str) -> CacheRead<String> {
        self.get(&keys::refresh_token_user(refresh_token)).await
    }

    /// Drop the reverse mapping for a refresh token that was rotated away,
    /// so it can no longer pass the ownership check.
    pub async fn forget_refresh_owner(&self, refresh_token: &str) -> CacheWrite {
        self.delete(&keys::refresh_token_user(refresh_token)).await
    }

    /// Read-through lookup of the cached user snapshot.
    pub async fn lookup_cached_user(&self, email: &str) -> CacheRead<User> {
        match self.get(&keys::user(email)).await {
            CacheRead::Hit(json) => match serde_json::from_str::<User>(&json) {
                Ok(user) => CacheRead::Hit(user),
                Err(e) => {
                    tracing::warn!(error = %e, email = %email, "Discarding undecodable cached user snapshot");
                    CacheRead::Miss
                }
            },
            CacheRead::Miss => CacheRead::Miss,
            CacheRead::Unavailable => CacheRead::Unavailable,
        }
    }

    /// Cache a user snapshot with the fixed profile-freshness TTL, which is
    /// independent of token lifetimes.
    pub async fn cache_user(&self, user: &User) -> CacheWrite {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize user snapshot for caching");
                return CacheWrite::Degraded;
            }
        };

        self.set_ex(&keys::user(&user.email), &json, self.user_cache_ttl_seconds)
            .await
    }

    /// Drop the cached snapshot, forcing a database reload on the next
    /// authenticated request.
    pub async fn invalidate_user(&self, email: &str) -> CacheWrite {
        self.delete(&keys::user(email)).await
    }

    /// Connectivity probe for health checks.
    pub async fn is_healthy(&self) -> bool {
        self.backend.ping().await.is_ok()
    }

    async fn get(&self, key: &str) -> CacheRead<String> {
        match self.backend.get(key).await {
            Ok(Some(value)) => CacheRead::Hit(value),
            Ok(None) => CacheRead::Miss,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Session store read failed");
                CacheRead::Unavailable
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheWrite {
        match self.backend.set_ex(key, value, ttl_seconds).await {
            Ok(()) => CacheWrite::Applied,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Session store write failed");
                CacheWrite::Degraded
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheWrite {
        match self.backend.delete(key).await {
            Ok(()) => CacheWrite::Applied,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Session store delete failed");
                CacheWrite::Degraded
            }
        }
    }
}

//! Session Revocation and Rotation Tests
//!
//! These tests drive the revocation state machine over an in-memory backend
//! honoring the session store's key-value contract: refresh-token rotation,
//! logout blacklisting, and reuse of revoked or rotated tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::RwLock;
use tower::ServiceExt;

use marketlens_server::auth::{AuthError, AuthService, TokenCodec, TokenPurpose};
use marketlens_server::config::{Config, Environment};
use marketlens_server::email::Mailer;
use marketlens_server::handlers;
use marketlens_server::models::User;
use marketlens_server::session::{CacheRead, SessionBackend, SessionStore, StoreError};
use marketlens_server::state::AppState;
use marketlens_server::users::UserRepository;

/// In-memory backend honoring the store's key-value contract.
#[derive(Default)]
struct MemoryBackend {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn memory_store() -> SessionStore {
    SessionStore::with_backend(Arc::new(MemoryBackend::default()), 900)
}

fn test_config() -> Config {
    Config {
        database_url: "postgres://marketlens@127.0.0.1:9/marketlens".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        environment: Environment::Development,
        port: 8000,
        db_max_connections: 2,
        rate_limit_max_requests: 10,
        rate_limit_window_seconds: 10,
        cors_allowed_origins: None,
        log_level: "info".to_string(),
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        reset_token_secret: "test-reset-secret".to_string(),
        access_token_ttl_seconds: 900,
        refresh_token_ttl_days: 7,
        reset_token_ttl_minutes: 30,
        user_cache_ttl_seconds: 900,
        mailersend_api_key: None,
        email_from: None,
        email_from_name: None,
        frontend_reset_url: None,
    }
}

// Points at a closed port: connecting fails fast, so any test that reaches
// the database proves which gate let it through.
fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(100))
        .connect_lazy("postgres://marketlens@127.0.0.1:9/marketlens")
        .unwrap()
}

fn test_user() -> User {
    User {
        id: 7,
        email: "trader@example.com".to_string(),
        full_name: Some("Pat Trader".to_string()),
        hashed_password: "$argon2id$placeholder".to_string(),
        is_active: true,
        is_superuser: false,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Refresh Rotation Tests
// ============================================================================

#[tokio::test]
async fn test_rotation_drops_previous_refresh_mapping() {
    let sessions = memory_store();

    assert!(!sessions
        .remember_session(7, "trader@example.com", "A1", "R1", 900, 604_800)
        .await
        .is_degraded());

    // Rotation: record the replacement pair, forget the old mapping.
    assert!(!sessions
        .remember_session(7, "trader@example.com", "A2", "R2", 900, 604_800)
        .await
        .is_degraded());
    assert!(!sessions.forget_refresh_owner("R1").await.is_degraded());

    assert_eq!(sessions.refresh_owner("R1").await, CacheRead::Miss);
    assert_eq!(
        sessions.refresh_owner("R2").await,
        CacheRead::Hit("trader@example.com".to_string())
    );
}

#[tokio::test]
async fn test_replayed_refresh_token_is_rejected() {
    let sessions = memory_store();
    let config = test_config();
    let codec = Arc::new(TokenCodec::new(&config));
    let users = UserRepository::new(unreachable_pool());
    let service = AuthService::new(users, codec.clone(), sessions.clone(), &config);

    let old_refresh = codec
        .issue("trader@example.com", TokenPurpose::Refresh)
        .unwrap();

    // Post-rotation state: the store only knows the replacement pair. The
    // replayed token still verifies cryptographically but must be rejected
    // by the ownership check, before any database access.
    assert!(!sessions
        .remember_session(7, "trader@example.com", "A2", "R2", 900, 604_800)
        .await
        .is_degraded());

    let err = service.refresh(&old_refresh).await.unwrap_err();
    assert!(matches!(err, AuthError::RevokedOrInvalid));
}

#[tokio::test]
async fn test_recorded_refresh_token_passes_ownership_check() {
    let sessions = memory_store();
    let config = test_config();
    let codec = Arc::new(TokenCodec::new(&config));
    let users = UserRepository::new(unreachable_pool());
    let service = AuthService::new(users, codec.clone(), sessions.clone(), &config);

    let refresh = codec
        .issue("trader@example.com", TokenPurpose::Refresh)
        .unwrap();
    assert!(!sessions
        .remember_session(7, "trader@example.com", "A1", &refresh, 900, 604_800)
        .await
        .is_degraded());

    // With the mapping recorded, the ownership gate passes and the call
    // proceeds to the (unreachable) database instead of being rejected.
    let err = service.refresh(&refresh).await.unwrap_err();
    assert!(matches!(err, AuthError::Database(_)));
}

// ============================================================================
// Logout and Blacklist Tests
// ============================================================================

#[tokio::test]
async fn test_revoke_clears_refresh_reverse_mapping() {
    let sessions = memory_store();

    assert!(!sessions
        .remember_session(7, "trader@example.com", "A1", "R1", 900, 604_800)
        .await
        .is_degraded());
    assert!(!sessions
        .revoke(7, "trader@example.com", "A1", Some(60))
        .await
        .is_degraded());

    assert!(matches!(
        sessions.is_blacklisted("A1").await,
        CacheRead::Hit(())
    ));
    assert_eq!(sessions.refresh_owner("R1").await, CacheRead::Miss);
}

#[tokio::test]
async fn test_logout_blocks_reused_access_token() {
    let sessions = memory_store();
    let config = test_config();
    let codec = Arc::new(TokenCodec::new(&config));
    let users = UserRepository::new(unreachable_pool());
    let service = Arc::new(AuthService::new(
        users.clone(),
        codec.clone(),
        sessions.clone(),
        &config,
    ));
    let mailer = Arc::new(Mailer::new(&config));
    let state = AppState::new(service, codec.clone(), sessions.clone(), users, mailer);

    let app = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .with_state(state);

    let user = test_user();
    let token = codec.issue(&user.email, TokenPurpose::Access).unwrap();
    // Seed the profile cache so the request resolves without the database.
    assert!(!sessions.cache_user(&user).await.is_degraded());

    let ok = app.clone().oneshot(authed_request(&token)).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    assert!(!sessions
        .revoke(user.id, &user.email, &token, Some(60))
        .await
        .is_degraded());

    // Same token, immediately after logout: the blacklist wins even though
    // the signature still verifies.
    let denied = app.oneshot(authed_request(&token)).await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
}

fn authed_request(token: &str) -> Request<Body> {
    Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

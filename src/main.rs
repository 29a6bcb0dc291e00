//! MarketLens Backend Server
//!
//! HTTP entry point: loads configuration, connects the database and the
//! Redis session store, wires the auth services together, and serves the
//! API with graceful shutdown.

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use marketlens_server::auth::{AuthService, TokenCodec};
use marketlens_server::config::Config;
use marketlens_server::db;
use marketlens_server::email::Mailer;
use marketlens_server::handlers::health;
use marketlens_server::middleware::{self, RateLimiter};
use marketlens_server::routes;
use marketlens_server::session::SessionStore;
use marketlens_server::state::AppState;
use marketlens_server::users::UserRepository;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = %config.environment.as_str(), "Starting MarketLens backend");

    // Initialize database connection pool and schema
    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!(error = %e, "Database migration failed");
        std::process::exit(1);
    }

    // Connect the session store. The store is advisory at request time, but
    // a bad REDIS_URL is a deployment error worth failing fast on.
    tracing::info!("Connecting to session store...");
    let redis_client = match redis::Client::open(config.redis_url.as_str()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Invalid REDIS_URL");
            std::process::exit(1);
        }
    };
    let redis_manager = match redis::aio::ConnectionManager::new(redis_client).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Session store connection failed");
            std::process::exit(1);
        }
    };

    // Wire services with explicit configuration; no ambient globals
    let token_codec = Arc::new(TokenCodec::new(&config));
    let sessions = SessionStore::new(redis_manager, config.user_cache_ttl_seconds);
    let users = UserRepository::new(db_pool);
    let mailer = Arc::new(Mailer::new(&config));
    let auth_service = Arc::new(AuthService::new(
        users.clone(),
        token_codec.clone(),
        sessions.clone(),
        &config,
    ));

    let app_state = AppState::new(auth_service, token_codec, sessions, users, mailer);

    // Rate limiter with periodic cleanup of idle windows
    let rate_limiter = RateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window_seconds,
    );
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup(Duration::from_secs(600)).await;
        }
    });

    // Create the app router
    let app = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .merge(routes::auth_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn(middleware::rate_limit_layer(
            rate_limiter,
        )))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server shutdown complete");
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins.is_empty() {
        if config.environment.is_production() {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set in production; allowing all origins");
        }
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

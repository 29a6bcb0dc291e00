//! Rate limiting middleware
//!
//! Fixed-window counter per client IP: up to `max_requests` per window,
//! counters reset when the window rolls over.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window_seconds` per key
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Check if a request is allowed
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < self.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop windows idle longer than `max_age` (call periodically)
    pub async fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        windows.retain(|_, w| now.duration_since(w.started) < max_age);
    }
}

/// Create rate limiting middleware layer
pub fn rate_limit_layer(
    rate_limiter: RateLimiter,
) -> impl Fn(
    Request<Body>,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone
       + Send {
    move |request: Request<Body>, next: Next| {
        let rate_limiter = rate_limiter.clone();
        Box::pin(async move {
            let client_key = extract_client_ip(&request);

            if !rate_limiter.check(&client_key).await {
                tracing::warn!(client = %client_key, "Rate limit exceeded");
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, "1")],
                    "Too many requests. Please try again later.",
                )
                    .into_response();
            }

            next.run(request).await
        })
    }
}

/// Extract client IP from request headers
fn extract_client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(s) = forwarded.to_str() {
            if let Some(ip) = s.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(s) = real_ip.to_str() {
            return s.to_string();
        }
    }

    "unknown".to_string()
}

//! Per-IP token-bucket rate limiting for the API
//!
//! Buckets refill continuously at the configured rate up to `burst_size`.
//! Exempt paths and IPs bypass the buckets entirely.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

/// Continuously-refilling token bucket
struct Bucket {
    level: f64,
    topped_up: Instant,
}

impl Bucket {
    fn full(capacity: u32) -> Self {
        Self {
            level: capacity as f64,
            topped_up: Instant::now(),
        }
    }

    /// Refill for the time since the last call, then take one token.
    ///
    /// An empty bucket returns how many whole seconds until a token
    /// frees up, for the client's retry hint.
    fn take(&mut self, rate: f64, capacity: u32) -> Result<(), u64> {
        let now = Instant::now();
        let gained = now.duration_since(self.topped_up).as_secs_f64() * rate;
        self.level = (self.level + gained).min(capacity as f64);
        self.topped_up = now;

        if self.level < 1.0 {
            return Err(((1.0 - self.level) / rate).ceil() as u64);
        }
        self.level -= 1.0;
        Ok(())
    }
}

/// Per-IP bucket table shared across requests
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Start with an empty bucket table; buckets are created on first sight
    /// of each client IP.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn exempt_path(&self, path: &str) -> bool {
        // Entries act as prefixes, so "/api/v1/events" also covers subpaths
        self.config
            .exempt_paths
            .iter()
            .any(|e| path == e || path.starts_with(e.as_str()))
    }

    /// `None` admits the request; `Some(secs)` is the suggested retry delay.
    pub async fn check(&self, path: &str, addr: SocketAddr) -> Option<u64> {
        if self.exempt_path(path) || self.config.exempt_ips.contains(&addr.ip()) {
            return None;
        }

        // The lock covers only the table lookup and the O(1) take
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(addr.ip())
            .or_insert_with(|| Bucket::full(self.config.burst_size));
        bucket
            .take(
                self.config.requests_per_second as f64,
                self.config.burst_size,
            )
            .err()
    }
}

/// Middleware: consult the limiter, 429 with a retry hint when drained
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let Some(retry_after) = limiter.check(req.uri().path(), addr).await else {
        return next.run(req).await;
    };

    let body = json!({
        "error": {
            "code": "rate_limited",
            "message": "Too many requests",
            "details": { "retry_after_seconds": retry_after }
        }
    });
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

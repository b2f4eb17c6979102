//! # Per-Caller Rate Limiting
//!
//! Fixed-window counter keyed by the authenticated caller's user id.
//! Runs after authentication, so the [`CallerIdentity`] is already in the
//! request extensions. In-memory only; each process counts on its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::ErrorBody;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    count: u64,
    window_start: Instant,
}

#[derive(Debug)]
struct Buckets {
    by_key: HashMap<String, Bucket>,
    last_sweep: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<Buckets>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(Buckets {
                by_key: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Count one request for `key`; `false` once the window is exhausted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let window = self.config.window;
        let mut buckets = self.buckets.lock();

        // Expired buckets are dropped once per window.
        if now.saturating_duration_since(buckets.last_sweep) >= window {
            buckets
                .by_key
                .retain(|_, b| now.saturating_duration_since(b.window_start) < window);
            buckets.last_sweep = now;
        }

        let bucket = buckets.by_key.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });

        if now.saturating_duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.buckets.lock().by_key.len()
    }
}

/// Middleware that enforces per-caller rate limits.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = request
            .extensions()
            .get::<CallerIdentity>()
            .map(|c| c.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        if !limiter.check(&key) {
            tracing::warn!(caller = %key, "rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody::new("RATE_LIMITED", "rate limit exceeded")),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[test]
    fn blocks_after_max_requests() {
        let limiter = limiter(2);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn window_resets() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start + Duration::from_secs(30)));
        assert!(limiter.check_at("a", start + Duration::from_secs(61)));
    }

    #[test]
    fn expired_buckets_are_dropped() {
        let limiter = limiter(5);
        let start = Instant::now();
        for i in 0..500 {
            assert!(limiter.check_at(&format!("caller-{i}"), start));
        }
        assert_eq!(limiter.tracked_keys(), 500);

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("fresh", later));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn live_buckets_survive_a_sweep() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.check_at("old", start));
        assert!(limiter.check_at("recent", start + Duration::from_secs(40)));

        let later = start + Duration::from_secs(70);
        assert!(limiter.check_at("other", later));
        assert_eq!(limiter.tracked_keys(), 2);
        assert!(!limiter.check_at("recent", later));
    }
}

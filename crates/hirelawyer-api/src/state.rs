//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! Two storage modes exist. With a database pool every collaborator is
//! PostgreSQL-backed; without one, [`MemoryStore`] and [`MemoryNotifier`]
//! stand in and nothing survives a restart.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::booking::BookingService;
use crate::db::{PgNotifier, PgRepository};
use crate::middleware::rate_limit::RateLimitConfig;
use crate::notify::{MemoryNotifier, NotificationInbox};
use crate::repository::MemoryStore;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Serve `/metrics` when a Prometheus handle is installed.
    pub metrics_enabled: bool,
    /// Requests allowed per caller and window.
    pub rate_limit_max_requests: u64,
    pub rate_limit_window: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window", &self.rate_limit_window)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let limits = RateLimitConfig::default();
        Self {
            port: 8080,
            auth_token: None,
            metrics_enabled: true,
            rate_limit_max_requests: limits.max_requests,
            rate_limit_window: limits.window,
        }
    }
}

impl AppConfig {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: self.rate_limit_window,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub booking: BookingService,
    pub inbox: Arc<dyn NotificationInbox>,
    pub config: AppConfig,
    /// Present only when the Prometheus recorder was installed.
    pub metrics: Option<PrometheusHandle>,
    /// `None` in in-memory mode.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// In-memory state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self::in_memory(config, MemoryStore::new(), MemoryNotifier::new())
    }

    /// State over caller-supplied in-memory collaborators, e.g. after seeding.
    pub fn in_memory(config: AppConfig, store: MemoryStore, notifier: MemoryNotifier) -> Self {
        let shared = Arc::new(store);
        let notifier = Arc::new(notifier);
        let booking = BookingService::new(
            shared.clone(),
            shared.clone(),
            shared,
            notifier.clone(),
        );
        Self {
            booking,
            inbox: notifier,
            config,
            metrics: None,
            db_pool: None,
        }
    }

    /// PostgreSQL-backed state.
    pub fn with_postgres(config: AppConfig, pool: PgPool) -> Self {
        let repo = Arc::new(PgRepository::new(pool.clone()));
        let notifier = Arc::new(PgNotifier::new(pool.clone()));
        let booking = BookingService::new(repo.clone(), repo.clone(), repo, notifier.clone());
        Self {
            booking,
            inbox: notifier,
            config,
            metrics: None,
            db_pool: Some(pool),
        }
    }

    /// Attach the handle of an installed Prometheus recorder.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("hunter2".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn default_state_is_in_memory() {
        let state = AppState::new();
        assert!(state.db_pool.is_none());
        assert!(state.metrics.is_none());
        assert_eq!(state.config.port, 8080);
        assert_eq!(state.config.rate_limit().max_requests, 1000);
    }
}

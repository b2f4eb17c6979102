//! # hirelawyer-api: Axum API Service for Lawyer Bookings
//!
//! Clients request appointments with lawyers, the two sides negotiate a fee,
//! and acceptance turns the request into a firm booking. The lifecycle
//! rules live in `hirelawyer-state`; this crate supplies storage, the
//! notifier, and the HTTP surface.
//!
//! ## API Surface
//!
//! | Prefix                              | Module                       |
//! |-------------------------------------|------------------------------|
//! | `/v1/appointments/*`                | [`routes::appointments`]     |
//! | `/v1/appointments/{id}/messages`    | [`routes::messages`]         |
//! | `/v1/notifications/*`               | [`routes::notifications`]    |
//! | `/openapi.json`                     | [`openapi`]                  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Health probes and `/metrics` sit outside the stack and need no credentials.

pub mod auth;
pub mod booking;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod seed;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let limiter = RateLimiter::new(state.config.rate_limit());

    let api = Router::new()
        .merge(routes::appointments::router())
        .merge(routes::messages::router())
        .merge(routes::notifications::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the database (if any) answers.
async fn readiness(State(state): State<AppState>) -> Response {
    if let Some(pool) = &state.db_pool {
        if let Err(err) = db::ping(pool).await {
            tracing::warn!(error = %err, "readiness check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response();
        }
    }
    "ready".into_response()
}

/// Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match (&state.metrics, state.config.metrics_enabled) {
        (Some(handle), true) => handle.render().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

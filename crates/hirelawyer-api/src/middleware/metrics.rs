//! # Request Metrics
//!
//! Counts every response by status class through the `metrics` facade.
//! When the Prometheus recorder is installed the counters are served at
//! `/metrics`; otherwise the calls are no-ops.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics::counter;

/// `2xx`, `4xx`, ...
pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Middleware that counts responses by status class.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    counter!(
        "hirelawyer_http_requests_total",
        "status_class" => status_class(response.status())
    )
    .increment(1);
    response
}

//! # Authentication Middleware
//!
//! Bearer tokens carry the caller's role and user id:
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}
//! ```
//!
//! `secret` is compared in constant time against the configured token.
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions; handlers extract it via `FromRequestParts`.
//!
//! When no token is configured (development mode) the secret is not
//! checked, and a request without an `Authorization` header acts as the
//! system admin.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use hirelawyer_core::{Role, UserId};
use hirelawyer_state::Actor;

use crate::error::{AppError, ErrorBody};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: UserId,
    pub role: Role,
}

impl CallerIdentity {
    /// The identity used when authentication is disabled.
    pub fn system_admin() -> Self {
        Self {
            id: UserId::system(),
            role: Role::Admin,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{user_id}:{secret}`.
///
/// With `expected_secret = None` the secret part is accepted as given.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let [role_str, user_str, secret] = parts.as_slice() else {
        return Err("invalid token format, expected {role}:{user_id}:{secret}".into());
    };

    if let Some(expected) = expected_secret {
        if !constant_time_token_eq(secret, expected) {
            return Err("invalid bearer token".into());
        }
    }

    let role: Role = role_str.parse().map_err(|e| format!("{e}"))?;
    let id: UserId = user_str.parse().map_err(|e| format!("{e}"))?;
    Ok(CallerIdentity { id, role })
}

// ── Middleware ───────────────────────────────────────────────────────────────

pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = match (auth_header, expected.as_deref()) {
        (Some(value), expected) => match value.strip_prefix("Bearer ") {
            Some(token) => parse_bearer_token(token, expected),
            None => Err("authorization header must use Bearer scheme".to_string()),
        },
        (None, Some(_)) => Err("missing authorization header".to_string()),
        (None, None) => Ok(CallerIdentity::system_admin()),
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("UNAUTHORIZED", msg)),
            )
                .into_response()
        }
    }
}

//! # Notifications API
//!
//! The authenticated user's own inbox. Only ever touches the caller's
//! notifications; another user's id behaves as if it did not exist.

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::booking::BookingError;
use crate::error::AppError;
use crate::extractors::notification_id;
use crate::notify::{NotificationRecord, INBOX_LIMIT};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub unread: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InboxAck {
    pub message: String,
    /// Number of notifications that changed.
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/unread-count", get(unread_count))
        .route("/v1/notifications/read-all", patch(mark_all_read))
        .route("/v1/notifications/{id}/read", patch(mark_read))
}

/// GET /v1/notifications: Latest notifications for the caller.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    responses(
        (status = 200, description = "Newest first, at most 50", body = Vec<NotificationRecord>),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    let entries = state
        .inbox
        .list(caller.id, INBOX_LIMIT)
        .await
        .map_err(BookingError::from)?;
    Ok(Json(entries))
}

/// GET /v1/notifications/unread-count
#[utoipa::path(
    get,
    path = "/v1/notifications/unread-count",
    responses((status = 200, description = "Unread count", body = UnreadCount)),
    tag = "notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UnreadCount>, AppError> {
    let unread = state
        .inbox
        .unread_count(caller.id)
        .await
        .map_err(BookingError::from)?;
    Ok(Json(UnreadCount { unread }))
}

/// PATCH /v1/notifications/{id}/read
#[utoipa::path(
    patch,
    path = "/v1/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = InboxAck),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<InboxAck>, AppError> {
    let id = notification_id(&id)?;
    let found = state
        .inbox
        .mark_read(caller.id, id)
        .await
        .map_err(BookingError::from)?;
    if !found {
        return Err(BookingError::NotificationNotFound(id).into());
    }
    Ok(Json(InboxAck {
        message: "Marked read".to_string(),
        updated: 1,
    }))
}

/// PATCH /v1/notifications/read-all
#[utoipa::path(
    patch,
    path = "/v1/notifications/read-all",
    responses((status = 200, description = "All marked read", body = InboxAck)),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<InboxAck>, AppError> {
    let updated = state
        .inbox
        .mark_all_read(caller.id)
        .await
        .map_err(BookingError::from)?;
    Ok(Json(InboxAck {
        message: "All marked read".to_string(),
        updated,
    }))
}

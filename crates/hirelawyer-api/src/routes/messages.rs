//! # Appointment Messages API
//!
//! The per-appointment message log. Transitions append their own entries;
//! this endpoint adds free-text chat entries from parties and admins.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use hirelawyer_core::ValidationError;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{appointment_id, extract_validated_json, Validate};
use crate::repository::MessageRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    #[schema(value_type = String)]
    pub message: Option<String>,
}

impl Validate for PostMessageRequest {
    type Valid = String;

    fn validate(self) -> Result<String, ValidationError> {
        self.message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::EmptyMessage)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostMessageResponse {
    pub message: String,
    pub entry: MessageRecord,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/appointments/{id}/messages",
        get(list_messages).post(post_message),
    )
}

/// GET /v1/appointments/{id}/messages: Message log, oldest first.
#[utoipa::path(
    get,
    path = "/v1/appointments/{id}/messages",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Message log", body = Vec<MessageRecord>),
        (status = 403, description = "Not allowed", body = crate::error::ErrorBody),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorBody),
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageRecord>>, AppError> {
    let id = appointment_id(&id)?;
    let messages = state.booking.messages(&caller.actor(), id).await?;
    Ok(Json(messages))
}

/// POST /v1/appointments/{id}/messages: Append a chat entry.
#[utoipa::path(
    post,
    path = "/v1/appointments/{id}/messages",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Sent", body = PostMessageResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorBody),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorBody),
        (status = 422, description = "Message is required", body = crate::error::ErrorBody),
    ),
    tag = "messages"
)]
pub async fn post_message(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostMessageResponse>), AppError> {
    let id = appointment_id(&id)?;
    let text = extract_validated_json(body)?;
    let entry = state.booking.post_message(&caller.actor(), id, &text).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostMessageResponse {
            message: "Sent".to_string(),
            entry,
        }),
    ))
}

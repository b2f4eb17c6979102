//! # Appointments API
//!
//! Request, negotiate, accept, reject, complete and cancel appointments.
//! Bodies are parsed and validated before the booking service is called,
//! so malformed input is reported ahead of missing appointments.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use hirelawyer_core::{Fee, FeeInput, Slot, ValidationError};
use hirelawyer_state::Appointment;

use crate::auth::CallerIdentity;
use crate::booking::CreateAppointment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{
    appointment_id, extract_validated_json, optional_fee, required_fee, required_text, Validate,
};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to book an appointment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    #[schema(value_type = String, format = Uuid)]
    pub lawyer_id: Option<String>,
    #[schema(value_type = String, example = "2026-02-10")]
    pub appointment_date: Option<String>,
    #[schema(value_type = String, example = "10:00")]
    pub appointment_time: Option<String>,
    #[schema(value_type = String)]
    pub subject: Option<String>,
    pub details: Option<String>,
    /// Defaults to the lawyer's hourly rate when absent or blank.
    #[schema(value_type = Option<String>, example = "150.00")]
    pub proposed_fee: Option<FeeInput>,
}

impl Validate for CreateAppointmentRequest {
    type Valid = CreateAppointment;

    fn validate(self) -> Result<CreateAppointment, ValidationError> {
        let lawyer_id = required_text(self.lawyer_id, "lawyer_id")?.parse()?;
        let date = required_text(self.appointment_date, "appointment_date")?;
        let time = required_text(self.appointment_time, "appointment_time")?;
        let subject = required_text(self.subject, "subject")?;
        let slot = Slot::parse(&date, &time)?;
        Ok(CreateAppointment {
            lawyer_id,
            slot,
            subject,
            details: self
                .details
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            proposed_fee: optional_fee(self.proposed_fee)?,
        })
    }
}

/// Lawyer's fee offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OfferRequest {
    #[schema(value_type = String, example = "140.00")]
    pub offered_fee: Option<FeeInput>,
    pub negotiation_note: Option<String>,
}

impl Validate for OfferRequest {
    type Valid = (Fee, Option<String>);

    fn validate(self) -> Result<Self::Valid, ValidationError> {
        Ok((
            required_fee(self.offered_fee, "offered_fee")?,
            self.negotiation_note,
        ))
    }
}

/// Client's counter-offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CounterRequest {
    #[schema(value_type = String, example = "120.00")]
    pub proposed_fee: Option<FeeInput>,
    pub negotiation_note: Option<String>,
}

impl Validate for CounterRequest {
    type Valid = (Fee, Option<String>);

    fn validate(self) -> Result<Self::Valid, ValidationError> {
        Ok((
            required_fee(self.proposed_fee, "proposed_fee")?,
            self.negotiation_note,
        ))
    }
}

// ── Response DTOs ───────────────────────────────────────────────────

/// An appointment as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentView {
    #[schema(value_type = String, format = Uuid)]
    pub appointment_id: String,
    #[schema(value_type = String, format = Uuid)]
    pub client_id: String,
    #[schema(value_type = String, format = Uuid)]
    pub lawyer_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub subject: String,
    pub details: Option<String>,
    #[schema(value_type = String, example = "150.00")]
    pub proposed_fee: Fee,
    #[schema(value_type = Option<String>)]
    pub offered_fee: Option<Fee>,
    #[schema(value_type = Option<String>)]
    pub final_fee: Option<Fee>,
    pub negotiation_note: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentView {
    fn from(appointment: &Appointment) -> Self {
        let r = appointment.record();
        Self {
            appointment_id: r.id.to_string(),
            client_id: r.client_id.to_string(),
            lawyer_id: r.lawyer_id.to_string(),
            appointment_date: r.slot.date_string(),
            appointment_time: r.slot.time_string(),
            subject: r.subject.clone(),
            details: r.details.clone(),
            proposed_fee: r.proposed_fee,
            offered_fee: r.offered_fee,
            final_fee: r.final_fee,
            negotiation_note: r.negotiation_note.clone(),
            status: r.status.as_str().to_string(),
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub message: String,
    #[schema(value_type = String, format = Uuid)]
    pub appointment_id: String,
}

/// Acknowledgement of a transition.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub message: String,
    #[schema(example = "negotiating")]
    pub status: String,
    /// Present once the fee is agreed.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub final_fee: Option<Fee>,
}

impl TransitionResponse {
    fn new(message: &str, appointment: &Appointment) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
            status: appointment.status().as_str().to_string(),
            final_fee: appointment.final_fee(),
        })
    }
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/appointments", post(create_appointment))
        .route("/v1/appointments/my", get(list_my_appointments))
        .route("/v1/appointments/{id}", get(get_appointment))
        .route("/v1/appointments/{id}/offer", patch(offer_fee))
        .route("/v1/appointments/{id}/counter", patch(counter_offer))
        .route("/v1/appointments/{id}/accept", patch(accept_as_lawyer))
        .route("/v1/appointments/{id}/confirm", patch(accept_as_client))
        .route("/v1/appointments/{id}/reject", patch(reject_appointment))
        .route("/v1/appointments/{id}/complete", patch(complete_appointment))
        .route("/v1/appointments/{id}/cancel", patch(cancel_appointment))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/appointments: Request an appointment (clients only).
#[utoipa::path(
    post,
    path = "/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment requested", body = CreatedResponse),
        (status = 403, description = "Caller is not a client", body = ErrorBody),
        (status = 404, description = "Lawyer not found", body = ErrorBody),
        (status = 409, description = "Slot not available", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let command = extract_validated_json(body)?;
    let appointment = state.booking.create(&caller.actor(), command).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Appointment requested".to_string(),
            appointment_id: appointment.id().to_string(),
        }),
    ))
}

/// GET /v1/appointments/my: Appointments the caller is party to (all for admins).
#[utoipa::path(
    get,
    path = "/v1/appointments/my",
    responses(
        (status = 200, description = "Appointments, newest first", body = Vec<AppointmentView>),
    ),
    tag = "appointments"
)]
pub async fn list_my_appointments(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let appointments = state.booking.list_for(&caller.actor()).await?;
    Ok(Json(appointments.iter().map(AppointmentView::from).collect()))
}

/// GET /v1/appointments/{id}: A single appointment.
#[utoipa::path(
    get,
    path = "/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentView),
        (status = 403, description = "Not a party", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<AppointmentView>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.get(&caller.actor(), id).await?;
    Ok(Json(AppointmentView::from(&appointment)))
}

/// PATCH /v1/appointments/{id}/offer: Lawyer offers a fee.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/offer",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = OfferRequest,
    responses(
        (status = 200, description = "Offer sent", body = TransitionResponse),
        (status = 403, description = "Not the owning lawyer", body = ErrorBody),
        (status = 409, description = "Appointment already finalized", body = ErrorBody),
        (status = 422, description = "Fee missing or invalid", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn offer_fee(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<OfferRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let (fee, note) = extract_validated_json(body)?;
    let appointment = state.booking.offer(&caller.actor(), id, fee, note).await?;
    Ok(TransitionResponse::new("Offer sent", &appointment))
}

/// PATCH /v1/appointments/{id}/counter: Client replaces their ask.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/counter",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = CounterRequest,
    responses(
        (status = 200, description = "Counter offer sent", body = TransitionResponse),
        (status = 403, description = "Not the owning client", body = ErrorBody),
        (status = 409, description = "Appointment already finalized", body = ErrorBody),
        (status = 422, description = "Fee missing or invalid", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn counter_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<CounterRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let (fee, note) = extract_validated_json(body)?;
    let appointment = state.booking.counter(&caller.actor(), id, fee, note).await?;
    Ok(TransitionResponse::new("Counter offer sent", &appointment))
}

/// PATCH /v1/appointments/{id}/accept: Owning lawyer or an admin accepts.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/accept",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment accepted", body = TransitionResponse),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 409, description = "Already finalized or slot taken", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn accept_as_lawyer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.accept_as_lawyer(&caller.actor(), id).await?;
    Ok(TransitionResponse::new("Appointment accepted", &appointment))
}

/// PATCH /v1/appointments/{id}/confirm: Client accepts the lawyer's offer.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/confirm",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Offer accepted", body = TransitionResponse),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 409, description = "No offer, already finalized, or slot taken", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn accept_as_client(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.accept_as_client(&caller.actor(), id).await?;
    Ok(TransitionResponse::new("Offer accepted", &appointment))
}

/// PATCH /v1/appointments/{id}/reject: Owning lawyer or an admin declines.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/reject",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment rejected", body = TransitionResponse),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 409, description = "Appointment already finalized", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn reject_appointment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.reject(&caller.actor(), id).await?;
    Ok(TransitionResponse::new("Appointment rejected", &appointment))
}

/// PATCH /v1/appointments/{id}/complete: Mark an approved appointment as held.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/complete",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment completed", body = TransitionResponse),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 409, description = "Appointment not approved", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn complete_appointment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.complete(&caller.actor(), id).await?;
    Ok(TransitionResponse::new("Appointment completed", &appointment))
}

/// PATCH /v1/appointments/{id}/cancel: Admin withdraws an approved appointment.
#[utoipa::path(
    patch,
    path = "/v1/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment cancelled", body = TransitionResponse),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 409, description = "Appointment not approved", body = ErrorBody),
    ),
    tag = "appointments"
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = appointment_id(&id)?;
    let appointment = state.booking.cancel(&caller.actor(), id).await?;
    Ok(TransitionResponse::new("Appointment cancelled", &appointment))
}

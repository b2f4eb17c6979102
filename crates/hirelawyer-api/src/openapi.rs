//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HireLawyer Booking API",
        version = "0.1.0",
        description = "Appointment requests, fee negotiation, approval with slot-conflict enforcement, message logs and notification inboxes."
    ),
    paths(
        // Appointments
        crate::routes::appointments::create_appointment,
        crate::routes::appointments::list_my_appointments,
        crate::routes::appointments::get_appointment,
        crate::routes::appointments::offer_fee,
        crate::routes::appointments::counter_offer,
        crate::routes::appointments::accept_as_lawyer,
        crate::routes::appointments::accept_as_client,
        crate::routes::appointments::reject_appointment,
        crate::routes::appointments::complete_appointment,
        crate::routes::appointments::cancel_appointment,
        // Messages
        crate::routes::messages::list_messages,
        crate::routes::messages::post_message,
        // Notifications
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::unread_count,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::mark_all_read,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::appointments::CreateAppointmentRequest,
        crate::routes::appointments::OfferRequest,
        crate::routes::appointments::CounterRequest,
        crate::routes::appointments::AppointmentView,
        crate::routes::appointments::CreatedResponse,
        crate::routes::appointments::TransitionResponse,
        crate::routes::messages::PostMessageRequest,
        crate::routes::messages::PostMessageResponse,
        crate::repository::MessageRecord,
        crate::notify::NotificationRecord,
        crate::routes::notifications::UnreadCount,
        crate::routes::notifications::InboxAck,
    )),
    tags(
        (name = "appointments", description = "Booking lifecycle and fee negotiation"),
        (name = "messages", description = "Per-appointment message log"),
        (name = "notifications", description = "The caller's notification inbox"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

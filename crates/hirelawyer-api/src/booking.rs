//! # Booking Service
//!
//! Orchestrates every appointment operation:
//!
//! ```text
//! load ──▶ conflict verdict ──▶ pure transition ──▶ commit (appointment + message)
//!                                                          │
//!                                                          └──▶ notify (best effort)
//! ```
//!
//! Input parsing happens before this layer, so `InvalidInput` always wins
//! over `NotFound`. The service owns no state of its own; collaborators are
//! injected as trait objects.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;

use hirelawyer_core::{AppointmentId, ErrorKind, Fee, NotificationId, Slot, UserId, ValidationError};
use hirelawyer_state::{
    Actor, Appointment, AppointmentError, AppointmentRequest, ListScope, NewMessage, Operation,
    SlotAvailability, Transition,
};

use crate::notify::Notifier;
use crate::repository::{
    AppointmentRepository, LawyerDirectory, MessageLog, MessageRecord, StoreError,
};

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure of a booking operation.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Appointment not found")]
    AppointmentNotFound(AppointmentId),

    #[error("Lawyer not found")]
    LawyerNotFound(UserId),

    #[error("Notification not found")]
    NotificationNotFound(NotificationId),

    /// Read access by someone who is neither a party nor an admin.
    #[error("Not allowed")]
    NotVisible(AppointmentId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Appointment(e) => e.kind(),
            Self::Validation(e) => e.kind(),
            Self::AppointmentNotFound(_)
            | Self::LawyerNotFound(_)
            | Self::NotificationNotFound(_) => ErrorKind::NotFound,
            Self::NotVisible(_) => ErrorKind::Forbidden,
            Self::Store(StoreError::SlotTaken { .. }) => ErrorKind::Conflict,
            Self::Store(StoreError::StaleVersion { .. }) => ErrorKind::InvalidState,
            Self::Store(StoreError::Corrupt(_) | StoreError::Database(_)) => {
                ErrorKind::InternalFailure
            }
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────

/// A parsed create request.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub lawyer_id: UserId,
    pub slot: Slot,
    pub subject: String,
    pub details: Option<String>,
    pub proposed_fee: Option<Fee>,
}

// ─── Service ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BookingService {
    appointments: Arc<dyn AppointmentRepository>,
    messages: Arc<dyn MessageLog>,
    lawyers: Arc<dyn LawyerDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        messages: Arc<dyn MessageLog>,
        lawyers: Arc<dyn LawyerDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            appointments,
            messages,
            lawyers,
            notifier,
        }
    }

    /// Request a new appointment on behalf of a client.
    pub async fn create(
        &self,
        actor: &Actor,
        command: CreateAppointment,
    ) -> Result<Appointment, BookingError> {
        let op = Operation::Create;
        let result = async {
            Appointment::ensure_requester(actor)?;
            let lawyer = self
                .lawyers
                .find_lawyer(command.lawyer_id)
                .await?
                .ok_or(BookingError::LawyerNotFound(command.lawyer_id))?;
            let taken = self
                .appointments
                .has_slot_conflict(lawyer.id, command.slot, None)
                .await?;

            let request = AppointmentRequest {
                lawyer_id: lawyer.id,
                slot: command.slot,
                subject: command.subject,
                details: command.details,
                proposed_fee: command.proposed_fee,
            };
            let (appointment, transition) = Appointment::request(
                actor,
                request,
                lawyer.hourly_rate,
                SlotAvailability::from_conflict(taken),
            )?;
            let messages: Vec<NewMessage> = transition.messages().cloned().collect();
            self.appointments.insert(&appointment, &messages).await?;
            Ok::<_, BookingError>((appointment, transition))
        }
        .await;

        self.finish(actor, op, None, result).await
    }

    /// Lawyer offers a fee.
    pub async fn offer(
        &self,
        actor: &Actor,
        id: AppointmentId,
        fee: Fee,
        note: Option<String>,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::Offer, move |appt, by, _| {
            appt.offer(by, fee, note)
        })
        .await
    }

    /// Client replaces their ask.
    pub async fn counter(
        &self,
        actor: &Actor,
        id: AppointmentId,
        fee: Fee,
        note: Option<String>,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::Counter, move |appt, by, _| {
            appt.counter(by, fee, note)
        })
        .await
    }

    /// Lawyer or admin accepts.
    pub async fn accept_as_lawyer(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::AcceptAsLawyer, |appt, by, slot| {
            appt.accept_as_lawyer(by, slot)
        })
        .await
    }

    /// Client confirms the lawyer's offer.
    pub async fn accept_as_client(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::AcceptAsClient, |appt, by, slot| {
            appt.accept_as_client(by, slot)
        })
        .await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::Reject, |appt, by, _| appt.reject(by))
            .await
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::Complete, |appt, by, _| appt.complete(by))
            .await
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, id, Operation::Cancel, |appt, by, _| appt.cancel(by))
            .await
    }

    /// A single appointment, if the actor may see it.
    pub async fn get(&self, actor: &Actor, id: AppointmentId) -> Result<Appointment, BookingError> {
        let appointment = self.load(id).await?;
        if !appointment.is_visible_to(actor) {
            return Err(BookingError::NotVisible(id));
        }
        Ok(appointment)
    }

    /// Appointments the actor is party to; every appointment for admins.
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.appointments.list(ListScope::for_actor(actor)).await?)
    }

    /// The appointment's message log, oldest first.
    pub async fn messages(
        &self,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Vec<MessageRecord>, BookingError> {
        self.get(actor, id).await?;
        Ok(self.messages.list(id).await?)
    }

    /// Append a free-text chat entry. Does not change status.
    pub async fn post_message(
        &self,
        actor: &Actor,
        id: AppointmentId,
        text: &str,
    ) -> Result<MessageRecord, BookingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        self.get(actor, id).await?;
        let message = NewMessage {
            appointment_id: id,
            sender_id: actor.id,
            sender_role: actor.role,
            text: text.to_string(),
        };
        Ok(self.messages.append(&message).await?)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn load(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        self.appointments
            .find(id)
            .await?
            .ok_or(BookingError::AppointmentNotFound(id))
    }

    /// Load, run `apply` for `actor` with the current slot verdict, and commit.
    ///
    /// The verdict is only queried for operations that make a slot firm;
    /// all others see [`SlotAvailability::Free`].
    async fn transition<F>(
        &self,
        actor: &Actor,
        id: AppointmentId,
        op: Operation,
        apply: F,
    ) -> Result<Appointment, BookingError>
    where
        F: FnOnce(
            &mut Appointment,
            &Actor,
            SlotAvailability,
        ) -> Result<Transition, AppointmentError>,
    {
        let result = async {
            let mut appointment = self.load(id).await?;
            let availability = match op {
                Operation::AcceptAsLawyer | Operation::AcceptAsClient => {
                    let taken = self
                        .appointments
                        .has_slot_conflict(appointment.lawyer_id(), appointment.slot(), Some(id))
                        .await?;
                    SlotAvailability::from_conflict(taken)
                }
                _ => SlotAvailability::Free,
            };

            let expected_version = appointment.version();
            let transition = apply(&mut appointment, actor, availability)?;
            let messages: Vec<NewMessage> = transition.messages().cloned().collect();
            self.appointments
                .update(&appointment, expected_version, &messages)
                .await?;
            Ok::<_, BookingError>((appointment, transition))
        }
        .await;

        self.finish(actor, op, Some(id), result).await
    }

    /// Record the outcome, and dispatch notifications for committed work.
    async fn finish(
        &self,
        actor: &Actor,
        op: Operation,
        id: Option<AppointmentId>,
        result: Result<(Appointment, Transition), BookingError>,
    ) -> Result<Appointment, BookingError> {
        match result {
            Ok((appointment, transition)) => {
                counter!(
                    "hirelawyer_appointment_transitions_total",
                    "operation" => op.as_str(),
                    "role" => actor.role.as_str(),
                    "outcome" => "committed"
                )
                .increment(1);
                tracing::info!(
                    appointment_id = %appointment.id(),
                    actor_id = %actor.id,
                    actor_role = %actor.role,
                    operation = %op,
                    from = transition.from.map(|s| s.as_str()).unwrap_or("none"),
                    to = %transition.to,
                    "appointment transition committed"
                );
                self.dispatch(&transition).await;
                Ok(appointment)
            }
            Err(err) => {
                let outcome = match err.kind() {
                    ErrorKind::InternalFailure => {
                        tracing::error!(
                            appointment_id = ?id,
                            actor_id = %actor.id,
                            actor_role = %actor.role,
                            operation = %op,
                            error = %err,
                            "appointment storage failure"
                        );
                        "failed"
                    }
                    kind => {
                        tracing::debug!(
                            appointment_id = ?id,
                            actor_id = %actor.id,
                            actor_role = %actor.role,
                            operation = %op,
                            kind = %kind,
                            reason = %err,
                            "appointment operation rejected"
                        );
                        "rejected"
                    }
                };
                counter!(
                    "hirelawyer_appointment_transitions_total",
                    "operation" => op.as_str(),
                    "role" => actor.role.as_str(),
                    "outcome" => outcome
                )
                .increment(1);
                Err(err)
            }
        }
    }

    async fn dispatch(&self, transition: &Transition) {
        for request in transition.notifications() {
            if let Err(err) = self.notifier.notify(request).await {
                counter!("hirelawyer_notifications_failed_total").increment(1);
                tracing::warn!(
                    recipient = %request.recipient,
                    kind = %request.kind,
                    error = %err,
                    "notification dispatch failed"
                );
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

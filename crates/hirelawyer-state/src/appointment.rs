//! # Appointment Lifecycle State Machine
//!
//! Models an appointment from the client's request through fee negotiation
//! to a firm booking.
//!
//! ## States
//!
//! ```text
//!                 offer / counter
//!                  ┌──────────┐
//!                  ▼          │
//! Pending ──▶ Negotiating ────┘
//!    │             │
//!    │             ├──▶ Approved ──▶ Completed
//!    │             │       │
//!    ├─────────────┴───────┼──▶ Rejected
//!    │                     └──▶ Cancelled
//!    └──▶ Approved
//! ```
//!
//! `Approved`, `Rejected`, `Cancelled` and `Completed` form the finalized
//! set: no fee negotiation and no acceptance is possible from any of them.
//! `Completed` and `Cancelled` are reachable only from `Approved`.
//!
//! ## Guards
//!
//! Every transition checks, in order: the actor's role, ownership, the
//! current status, the presence of an offer (client confirmation only),
//! and the slot verdict (transitions into `Approved` only). The first
//! failing guard determines the error.
//!
//! Transitions are pure. They mutate the appointment in place and return
//! the [`Effect`]s to perform; the caller persists the appointment together
//! with its message effects, then dispatches notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hirelawyer_core::{AppointmentId, ErrorKind, Fee, Role, Slot, UserId, ValidationError};

use crate::effect::{Effect, NewMessage, NotificationKind, NotificationRequest};

// ─── Appointment Status ──────────────────────────────────────────────

/// The lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Requested by the client, awaiting the lawyer.
    Pending,
    /// At least one offer or counter-offer has been made.
    Negotiating,
    /// Fee agreed and slot firmly booked.
    Approved,
    /// Declined by the lawyer or an admin (terminal).
    Rejected,
    /// Withdrawn by an admin after approval (terminal).
    Cancelled,
    /// The engagement took place (terminal).
    Completed,
}

impl AppointmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [AppointmentStatus; 6] = [
        Self::Pending,
        Self::Negotiating,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Whether fee negotiation and acceptance are closed.
    pub fn is_finalized(&self) -> bool {
        match self {
            Self::Pending | Self::Negotiating => false,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::Completed => true,
        }
    }

    /// Whether the appointment occupies its slot on the lawyer's calendar.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Pending | Self::Negotiating | Self::Approved => true,
            Self::Rejected | Self::Cancelled | Self::Completed => false,
        }
    }

    /// Whether a final fee must be recorded in this status.
    pub fn carries_final_fee(&self) -> bool {
        matches!(self, Self::Approved | Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Negotiating => "negotiating",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

// ─── Actors and Operations ───────────────────────────────────────────

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn client(id: UserId) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn lawyer(id: UserId) -> Self {
        Self::new(id, Role::Lawyer)
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }
}

/// A named lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Offer,
    Counter,
    AcceptAsLawyer,
    AcceptAsClient,
    Reject,
    Complete,
    Cancel,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Offer => "offer",
            Self::Counter => "counter",
            Self::AcceptAsLawyer => "accept_as_lawyer",
            Self::AcceptAsClient => "accept_as_client",
            Self::Reject => "reject",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    /// Who may perform this operation, for error messages.
    pub fn permitted(&self) -> &'static str {
        match self {
            Self::Create | Self::Counter | Self::AcceptAsClient => "clients",
            Self::Offer => "lawyers",
            Self::AcceptAsLawyer | Self::Reject | Self::Complete => "lawyers or admins",
            Self::Cancel => "admins",
        }
    }

    /// What this operation does, for error messages.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create => "create appointments",
            Self::Offer => "offer fees",
            Self::Counter => "counter offer",
            Self::AcceptAsLawyer => "accept appointments",
            Self::AcceptAsClient => "accept offers",
            Self::Reject => "reject appointments",
            Self::Complete => "complete appointments",
            Self::Cancel => "cancel appointments",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The Conflict Checker's verdict for the slot a transition would make firm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAvailability {
    Free,
    Taken,
}

impl SlotAvailability {
    pub fn from_conflict(has_conflict: bool) -> Self {
        if has_conflict {
            Self::Taken
        } else {
            Self::Free
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Business-rule rejections raised by the state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentError {
    /// The actor's role may not perform the operation at all.
    #[error("Only {} can {}", .operation.permitted(), .operation.action())]
    RoleNotPermitted { operation: Operation, role: Role },

    /// The actor has the right role but is not a party to this appointment.
    #[error("Not your appointment")]
    NotParty { operation: Operation },

    /// The appointment is in the finalized set.
    #[error("Appointment already {status}")]
    AlreadyFinalized {
        operation: Operation,
        status: AppointmentStatus,
    },

    /// Client confirmation without a lawyer offer.
    #[error("No lawyer offer to accept")]
    NoOfferToAccept,

    /// Complete and cancel require an approved appointment.
    #[error("Only approved appointments can be {}; current status is {status}", .operation.action())]
    NotApproved {
        operation: Operation,
        status: AppointmentStatus,
    },

    /// Another active appointment holds the slot.
    #[error("Selected time slot {slot} is not available")]
    SlotConflict { slot: Slot },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoleNotPermitted { .. } | Self::NotParty { .. } => ErrorKind::Forbidden,
            Self::AlreadyFinalized { .. } | Self::NoOfferToAccept | Self::NotApproved { .. } => {
                ErrorKind::InvalidState
            }
            Self::SlotConflict { .. } => ErrorKind::Conflict,
            Self::Validation(e) => e.kind(),
        }
    }
}

// ─── Transition Output ───────────────────────────────────────────────

/// Outcome of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub operation: Operation,
    /// `None` for creation.
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Message-log entries, to be committed with the appointment.
    pub fn messages(&self) -> impl Iterator<Item = &NewMessage> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Message(m) => Some(m),
            Effect::Notify(_) => None,
        })
    }

    /// Notification requests, to be dispatched after commit.
    pub fn notifications(&self) -> impl Iterator<Item = &NotificationRequest> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Notify(n) => Some(n),
            Effect::Message(_) => None,
        })
    }
}

// ─── Appointment ─────────────────────────────────────────────────────

/// The stored shape of an appointment.
///
/// Repositories read and write this directly. Everything else goes through
/// [`Appointment`], whose transitions are the only way status and fee
/// fields change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: AppointmentId,
    pub client_id: UserId,
    pub lawyer_id: UserId,
    pub slot: Slot,
    pub subject: String,
    pub details: Option<String>,
    pub proposed_fee: Fee,
    pub offered_fee: Option<Fee>,
    pub final_fee: Option<Fee>,
    pub negotiation_note: Option<String>,
    pub status: AppointmentStatus,
    /// Incremented by every transition. Used for optimistic concurrency.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A client's request for a new appointment.
#[derive(Debug, Clone)]
pub struct AppointmentRequest {
    pub lawyer_id: UserId,
    pub slot: Slot,
    pub subject: String,
    pub details: Option<String>,
    /// `None` falls back to the lawyer's hourly rate.
    pub proposed_fee: Option<Fee>,
}

/// An appointment under the control of the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Appointment {
    record: AppointmentRecord,
}

impl Appointment {
    /// Request a new appointment (→ PENDING).
    ///
    /// `availability` is the Conflict Checker's verdict for `request.slot`.
    pub fn request(
        actor: &Actor,
        request: AppointmentRequest,
        hourly_rate: Fee,
        availability: SlotAvailability,
    ) -> Result<(Self, Transition), AppointmentError> {
        Self::ensure_requester(actor)?;
        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(ValidationError::MissingField("subject").into());
        }
        if availability == SlotAvailability::Taken {
            return Err(AppointmentError::SlotConflict { slot: request.slot });
        }

        let now = Utc::now();
        let proposed_fee = request.proposed_fee.unwrap_or(hourly_rate);
        let record = AppointmentRecord {
            id: AppointmentId::new(),
            client_id: actor.id,
            lawyer_id: request.lawyer_id,
            slot: request.slot,
            subject: subject.to_string(),
            details: non_blank(request.details),
            proposed_fee,
            offered_fee: None,
            final_fee: None,
            negotiation_note: None,
            status: AppointmentStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let appointment = Self { record };

        let effects = vec![
            appointment.message(
                actor,
                format!("Requested appointment. Proposed fee: ${proposed_fee}"),
            ),
            appointment.notify(
                appointment.record.lawyer_id,
                NotificationKind::AppointmentRequest,
                "New appointment request",
                format!(
                    "Client requested \"{}\" on {}",
                    appointment.record.subject, appointment.record.slot
                ),
            ),
        ];
        let transition = Transition {
            operation: Operation::Create,
            from: None,
            to: AppointmentStatus::Pending,
            effects,
        };
        Ok((appointment, transition))
    }

    /// Only clients may request appointments.
    pub fn ensure_requester(actor: &Actor) -> Result<(), AppointmentError> {
        match actor.role {
            Role::Client => Ok(()),
            Role::Lawyer | Role::Admin => Err(role_not_permitted(Operation::Create, actor)),
        }
    }

    /// Lawyer proposes a fee (PENDING | NEGOTIATING → NEGOTIATING).
    pub fn offer(
        &mut self,
        actor: &Actor,
        offered_fee: Fee,
        note: Option<String>,
    ) -> Result<Transition, AppointmentError> {
        let op = Operation::Offer;
        match actor.role {
            Role::Lawyer => self.require_lawyer_owner(actor, op)?,
            Role::Client | Role::Admin => return Err(role_not_permitted(op, actor)),
        }
        self.require_open(op)?;

        self.record.offered_fee = Some(offered_fee);
        self.record.negotiation_note = non_blank(note);
        let effects = vec![
            self.message(actor, format!("Offered fee: ${offered_fee}")),
            self.notify(
                self.record.client_id,
                NotificationKind::FeeOffer,
                "Lawyer sent a fee offer",
                format!("Offered ${offered_fee}"),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Negotiating, effects))
    }

    /// Client replaces their ask (PENDING | NEGOTIATING → NEGOTIATING).
    pub fn counter(
        &mut self,
        actor: &Actor,
        proposed_fee: Fee,
        note: Option<String>,
    ) -> Result<Transition, AppointmentError> {
        let op = Operation::Counter;
        match actor.role {
            Role::Client => self.require_client_owner(actor, op)?,
            Role::Lawyer | Role::Admin => return Err(role_not_permitted(op, actor)),
        }
        self.require_open(op)?;

        self.record.proposed_fee = proposed_fee;
        self.record.negotiation_note = non_blank(note);
        let effects = vec![
            self.message(actor, format!("Counter offered: ${proposed_fee}")),
            self.notify(
                self.record.lawyer_id,
                NotificationKind::CounterOffer,
                "Client counter-offer",
                format!("Client countered on \"{}\"", self.record.subject),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Negotiating, effects))
    }

    /// Lawyer or admin accepts (PENDING | NEGOTIATING → APPROVED).
    ///
    /// The final fee is the lawyer's offer if one was made, otherwise the
    /// client's ask.
    pub fn accept_as_lawyer(
        &mut self,
        actor: &Actor,
        availability: SlotAvailability,
    ) -> Result<Transition, AppointmentError> {
        let op = Operation::AcceptAsLawyer;
        match actor.role {
            Role::Lawyer => self.require_lawyer_owner(actor, op)?,
            Role::Admin => {}
            Role::Client => return Err(role_not_permitted(op, actor)),
        }
        self.require_open(op)?;
        self.require_free(availability)?;

        let final_fee = self.record.offered_fee.unwrap_or(self.record.proposed_fee);
        self.record.final_fee = Some(final_fee);
        let effects = vec![
            self.message(actor, format!("Accepted appointment. Final fee: ${final_fee}")),
            self.notify(
                self.record.client_id,
                NotificationKind::AppointmentAccepted,
                "Appointment accepted",
                format!("Your appointment \"{}\" was accepted", self.record.subject),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Approved, effects))
    }

    /// Client confirms the lawyer's offer (PENDING | NEGOTIATING → APPROVED).
    pub fn accept_as_client(
        &mut self,
        actor: &Actor,
        availability: SlotAvailability,
    ) -> Result<Transition, AppointmentError> {
        let op = Operation::AcceptAsClient;
        match actor.role {
            Role::Client => self.require_client_owner(actor, op)?,
            Role::Lawyer | Role::Admin => return Err(role_not_permitted(op, actor)),
        }
        self.require_open(op)?;
        let final_fee = self
            .record
            .offered_fee
            .ok_or(AppointmentError::NoOfferToAccept)?;
        self.require_free(availability)?;

        self.record.final_fee = Some(final_fee);
        let effects = vec![
            self.message(actor, format!("Accepted lawyer offer. Final fee: ${final_fee}")),
            self.notify(
                self.record.lawyer_id,
                NotificationKind::OfferAccepted,
                "Client accepted your offer",
                format!("Appointment \"{}\" finalized", self.record.subject),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Approved, effects))
    }

    /// Lawyer or admin declines (PENDING | NEGOTIATING → REJECTED).
    pub fn reject(&mut self, actor: &Actor) -> Result<Transition, AppointmentError> {
        let op = Operation::Reject;
        match actor.role {
            Role::Lawyer => self.require_lawyer_owner(actor, op)?,
            Role::Admin => {}
            Role::Client => return Err(role_not_permitted(op, actor)),
        }
        self.require_open(op)?;

        let effects = vec![
            self.message(actor, "Rejected appointment".to_string()),
            self.notify(
                self.record.client_id,
                NotificationKind::AppointmentRejected,
                "Appointment rejected",
                format!("Your appointment \"{}\" was rejected", self.record.subject),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Rejected, effects))
    }

    /// Mark the engagement as having taken place (APPROVED → COMPLETED).
    pub fn complete(&mut self, actor: &Actor) -> Result<Transition, AppointmentError> {
        let op = Operation::Complete;
        match actor.role {
            Role::Lawyer => self.require_lawyer_owner(actor, op)?,
            Role::Admin => {}
            Role::Client => return Err(role_not_permitted(op, actor)),
        }
        self.require_approved(op)?;

        let effects = vec![
            self.message(actor, "Marked appointment as completed".to_string()),
            self.notify(
                self.record.client_id,
                NotificationKind::AppointmentCompleted,
                "Appointment completed",
                format!("Your appointment \"{}\" was marked as completed", self.record.subject),
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Completed, effects))
    }

    /// Administrative cancellation of a firm booking (APPROVED → CANCELLED).
    ///
    /// The final fee is cleared; the message log keeps the agreed amount.
    pub fn cancel(&mut self, actor: &Actor) -> Result<Transition, AppointmentError> {
        let op = Operation::Cancel;
        match actor.role {
            Role::Admin => {}
            Role::Client | Role::Lawyer => return Err(role_not_permitted(op, actor)),
        }
        self.require_approved(op)?;

        self.record.final_fee = None;
        let body = format!(
            "Appointment \"{}\" on {} was cancelled",
            self.record.subject, self.record.slot
        );
        let effects = vec![
            self.message(actor, "Cancelled appointment".to_string()),
            self.notify(
                self.record.client_id,
                NotificationKind::AppointmentCancelled,
                "Appointment cancelled",
                body.clone(),
            ),
            self.notify(
                self.record.lawyer_id,
                NotificationKind::AppointmentCancelled,
                "Appointment cancelled",
                body,
            ),
        ];
        Ok(self.do_transition(op, AppointmentStatus::Cancelled, effects))
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Rebuild from storage. Legacy rows are accepted as stored.
    pub fn from_record(record: AppointmentRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &AppointmentRecord {
        &self.record
    }

    pub fn into_record(self) -> AppointmentRecord {
        self.record
    }

    pub fn id(&self) -> AppointmentId {
        self.record.id
    }

    pub fn client_id(&self) -> UserId {
        self.record.client_id
    }

    pub fn lawyer_id(&self) -> UserId {
        self.record.lawyer_id
    }

    pub fn slot(&self) -> Slot {
        self.record.slot
    }

    pub fn status(&self) -> AppointmentStatus {
        self.record.status
    }

    pub fn final_fee(&self) -> Option<Fee> {
        self.record.final_fee
    }

    pub fn version(&self) -> i64 {
        self.record.version
    }

    /// Whether `user` is the client or the lawyer of this appointment.
    pub fn is_party(&self, user: UserId) -> bool {
        self.record.client_id == user || self.record.lawyer_id == user
    }

    /// Whether `actor` may read this appointment and its message log.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Client | Role::Lawyer => self.is_party(actor.id),
        }
    }

    // ── Guards ───────────────────────────────────────────────────────

    fn require_lawyer_owner(
        &self,
        actor: &Actor,
        operation: Operation,
    ) -> Result<(), AppointmentError> {
        if self.record.lawyer_id != actor.id {
            return Err(AppointmentError::NotParty { operation });
        }
        Ok(())
    }

    fn require_client_owner(
        &self,
        actor: &Actor,
        operation: Operation,
    ) -> Result<(), AppointmentError> {
        if self.record.client_id != actor.id {
            return Err(AppointmentError::NotParty { operation });
        }
        Ok(())
    }

    fn require_open(&self, operation: Operation) -> Result<(), AppointmentError> {
        if self.record.status.is_finalized() {
            return Err(AppointmentError::AlreadyFinalized {
                operation,
                status: self.record.status,
            });
        }
        Ok(())
    }

    fn require_approved(&self, operation: Operation) -> Result<(), AppointmentError> {
        if self.record.status != AppointmentStatus::Approved {
            return Err(AppointmentError::NotApproved {
                operation,
                status: self.record.status,
            });
        }
        Ok(())
    }

    fn require_free(&self, availability: SlotAvailability) -> Result<(), AppointmentError> {
        match availability {
            SlotAvailability::Free => Ok(()),
            SlotAvailability::Taken => Err(AppointmentError::SlotConflict {
                slot: self.record.slot,
            }),
        }
    }

    // ── Effects ──────────────────────────────────────────────────────

    fn message(&self, actor: &Actor, text: String) -> Effect {
        Effect::Message(NewMessage {
            appointment_id: self.record.id,
            sender_id: actor.id,
            sender_role: actor.role,
            text,
        })
    }

    fn notify(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        title: &str,
        body: String,
    ) -> Effect {
        Effect::Notify(NotificationRequest {
            recipient,
            appointment_id: Some(self.record.id),
            kind,
            title: title.to_string(),
            body: Some(body),
        })
    }

    fn do_transition(
        &mut self,
        operation: Operation,
        to: AppointmentStatus,
        effects: Vec<Effect>,
    ) -> Transition {
        let from = self.record.status;
        self.record.status = to;
        self.record.version += 1;
        self.record.updated_at = Utc::now();
        Transition {
            operation,
            from: Some(from),
            to,
            effects,
        }
    }
}

fn role_not_permitted(operation: Operation, actor: &Actor) -> AppointmentError {
    AppointmentError::RoleNotPermitted {
        operation,
        role: actor.role,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Listing Scope ───────────────────────────────────────────────────

/// Which appointments a user may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Appointments where the user is the client.
    AsClient(UserId),
    /// Appointments where the user is the lawyer.
    AsLawyer(UserId),
    /// Every appointment.
    All,
}

impl ListScope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Client => Self::AsClient(actor.id),
            Role::Lawyer => Self::AsLawyer(actor.id),
            Role::Admin => Self::All,
        }
    }

    pub fn includes(&self, record: &AppointmentRecord) -> bool {
        match self {
            Self::AsClient(id) => record.client_id == *id,
            Self::AsLawyer(id) => record.lawyer_id == *id,
            Self::All => true,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

//! # Storage Collaborators
//!
//! Traits the [`BookingService`](crate::booking::BookingService) depends on,
//! plus the in-memory implementation used in development mode and tests.
//! The PostgreSQL implementation lives in [`crate::db`].
//!
//! ## Concurrency
//!
//! Both backends enforce the active-slot constraint at write time:
//! PostgreSQL through a partial unique index, [`MemoryStore`] by running
//! the conflict predicate under the same write lock as the write. Both
//! reject an update whose `expected_version` no longer matches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use hirelawyer_core::{AppointmentId, Fee, MessageId, Role, Slot, UserId};
use hirelawyer_state::conflict;
use hirelawyer_state::{Appointment, AppointmentRecord, AppointmentStatus, ListScope, NewMessage};

// ─── Errors ──────────────────────────────────────────────────────────

/// Failures reported by storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The write would give a lawyer two active appointments in one slot.
    #[error("Selected time slot {slot} is not available")]
    SlotTaken { slot: Slot },

    /// The row changed since it was read.
    #[error("Appointment was modified concurrently; reload and retry")]
    StaleVersion { id: AppointmentId },

    /// A stored row could not be mapped back into the domain.
    #[error("corrupt stored row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ─── Records ─────────────────────────────────────────────────────────

/// A lawyer's listing, as far as booking is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lawyer {
    pub id: UserId,
    pub name: String,
    pub hourly_rate: Fee,
}

/// One stored entry of an appointment's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MessageRecord {
    #[schema(value_type = String, format = Uuid)]
    pub message_id: MessageId,
    #[schema(value_type = String, format = Uuid)]
    pub appointment_id: AppointmentId,
    #[schema(value_type = String, format = Uuid)]
    pub sender_id: UserId,
    #[schema(value_type = String, example = "lawyer")]
    pub sender_role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn from_new(message: &NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            message_id: MessageId::new(),
            appointment_id: message.appointment_id,
            sender_id: message.sender_id,
            sender_role: message.sender_role,
            message: message.text.clone(),
            created_at,
        }
    }
}

// ─── Traits ──────────────────────────────────────────────────────────

/// Durable home of appointments and the messages their transitions emit.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError>;

    /// Appointments in `scope`, newest first.
    async fn list(&self, scope: ListScope) -> Result<Vec<Appointment>, StoreError>;

    /// Whether another active appointment holds `slot` for `lawyer`.
    async fn has_slot_conflict(
        &self,
        lawyer: UserId,
        slot: Slot,
        exclude: Option<AppointmentId>,
    ) -> Result<bool, StoreError>;

    /// Store a new appointment together with its creation messages.
    async fn insert(
        &self,
        appointment: &Appointment,
        messages: &[NewMessage],
    ) -> Result<(), StoreError>;

    /// Store a transitioned appointment together with its messages, provided
    /// the stored version still equals `expected_version`.
    async fn update(
        &self,
        appointment: &Appointment,
        expected_version: i64,
        messages: &[NewMessage],
    ) -> Result<(), StoreError>;
}

/// Append-only per-appointment message log.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Entries for one appointment, oldest first.
    async fn list(&self, appointment: AppointmentId) -> Result<Vec<MessageRecord>, StoreError>;

    async fn append(&self, message: &NewMessage) -> Result<MessageRecord, StoreError>;
}

/// Read access to lawyer listings.
#[async_trait]
pub trait LawyerDirectory: Send + Sync {
    async fn find_lawyer(&self, id: UserId) -> Result<Option<Lawyer>, StoreError>;
}

// ─── In-Memory Store ─────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    appointments: HashMap<AppointmentId, AppointmentRecord>,
    messages: Vec<MessageRecord>,
    lawyers: HashMap<UserId, Lawyer>,
}

impl Tables {
    fn slot_taken(&self, record: &AppointmentRecord) -> bool {
        record.status.is_active()
            && conflict::has_slot_conflict(
                self.appointments.values(),
                record.lawyer_id,
                &record.slot,
                Some(record.id),
            )
    }

    fn push_messages(&mut self, messages: &[NewMessage], at: DateTime<Utc>) {
        self.messages
            .extend(messages.iter().map(|m| MessageRecord::from_new(m, at)));
    }
}

/// Process-local storage backing every collaborator trait.
///
/// All tables sit behind one lock so that a conflict check and the write it
/// guards are a single critical section.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a lawyer listing.
    pub fn upsert_lawyer(&self, lawyer: Lawyer) {
        self.tables.write().lawyers.insert(lawyer.id, lawyer);
    }

    /// Load rows as stored elsewhere, without any constraint checks.
    ///
    /// Rows written before the slot constraint existed may conflict; the
    /// state machine still re-checks on acceptance.
    pub fn hydrate(&self, records: Vec<AppointmentRecord>, messages: Vec<MessageRecord>) {
        let mut tables = self.tables.write();
        for record in records {
            tables.appointments.insert(record.id, record);
        }
        tables.messages.extend(messages);
    }

    pub fn appointment_count(&self) -> usize {
        self.tables.read().appointments.len()
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn find(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .tables
            .read()
            .appointments
            .get(&id)
            .cloned()
            .map(Appointment::from_record))
    }

    async fn list(&self, scope: ListScope) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read();
        let mut records: Vec<AppointmentRecord> = tables
            .appointments
            .values()
            .filter(|r| scope.includes(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records.into_iter().map(Appointment::from_record).collect())
    }

    async fn has_slot_conflict(
        &self,
        lawyer: UserId,
        slot: Slot,
        exclude: Option<AppointmentId>,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.read();
        Ok(conflict::has_slot_conflict(
            tables.appointments.values(),
            lawyer,
            &slot,
            exclude,
        ))
    }

    async fn insert(
        &self,
        appointment: &Appointment,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let record = appointment.record();
        let mut tables = self.tables.write();
        if tables.slot_taken(record) {
            return Err(StoreError::SlotTaken { slot: record.slot });
        }
        tables.appointments.insert(record.id, record.clone());
        tables.push_messages(messages, record.updated_at);
        Ok(())
    }

    async fn update(
        &self,
        appointment: &Appointment,
        expected_version: i64,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let record = appointment.record();
        let mut tables = self.tables.write();
        let current = tables
            .appointments
            .get(&record.id)
            .map(|r| (r.version, r.status));
        let Some((version, status)) = current else {
            return Err(StoreError::StaleVersion { id: record.id });
        };
        if version != expected_version {
            return Err(StoreError::StaleVersion { id: record.id });
        }
        let becomes_firm =
            record.status == AppointmentStatus::Approved && status != AppointmentStatus::Approved;
        if becomes_firm && tables.slot_taken(record) {
            return Err(StoreError::SlotTaken { slot: record.slot });
        }
        tables.appointments.insert(record.id, record.clone());
        tables.push_messages(messages, record.updated_at);
        Ok(())
    }
}

#[async_trait]
impl MessageLog for MemoryStore {
    async fn list(&self, appointment: AppointmentId) -> Result<Vec<MessageRecord>, StoreError> {
        let mut messages: Vec<MessageRecord> = self
            .tables
            .read()
            .messages
            .iter()
            .filter(|m| m.appointment_id == appointment)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn append(&self, message: &NewMessage) -> Result<MessageRecord, StoreError> {
        let record = MessageRecord::from_new(message, Utc::now());
        self.tables.write().messages.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl LawyerDirectory for MemoryStore {
    async fn find_lawyer(&self, id: UserId) -> Result<Option<Lawyer>, StoreError> {
        Ok(self.tables.read().lawyers.get(&id).cloned())
    }
}

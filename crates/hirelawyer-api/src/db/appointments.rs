//! Appointment, message log, and lawyer persistence.
//!
//! All writes that pair an appointment change with its message log entry
//! run in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use hirelawyer_core::{AppointmentId, Fee, MessageId, Role, Slot, UserId};
use hirelawyer_state::{Appointment, AppointmentRecord, AppointmentStatus, ListScope, NewMessage};

use crate::repository::{
    AppointmentRepository, Lawyer, LawyerDirectory, MessageLog, MessageRecord, StoreError,
};

const ACTIVE_SLOT_INDEX: &str = "appointments_active_slot_uq";

const SELECT_APPOINTMENT: &str = "SELECT appointment_id, client_id, lawyer_id, appointment_date, appointment_time,
        subject, details, proposed_fee_cents, offered_fee_cents, final_fee_cents,
        negotiation_note, status, version, created_at, updated_at
    FROM appointments";

/// PostgreSQL implementation of the storage collaborators.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a lawyer listing.
    pub async fn upsert_lawyer(&self, lawyer: &Lawyer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO lawyers (lawyer_id, name, hourly_rate_cents) VALUES ($1, $2, $3)
             ON CONFLICT (lawyer_id) DO UPDATE
             SET name = EXCLUDED.name, hourly_rate_cents = EXCLUDED.hourly_rate_cents",
        )
        .bind(*lawyer.id.as_uuid())
        .bind(&lawyer.name)
        .bind(lawyer.hourly_rate.cents())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Map a write failure, turning active-slot index violations into `SlotTaken`.
fn write_error(err: sqlx::Error, slot: Slot) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.constraint() == Some(ACTIVE_SLOT_INDEX) {
            return StoreError::SlotTaken { slot };
        }
    }
    StoreError::Database(err)
}

async fn insert_messages(
    tx: &mut Transaction<'_, Postgres>,
    messages: &[NewMessage],
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    for message in messages {
        let record = MessageRecord::from_new(message, at);
        insert_message(tx, &record).await?;
    }
    Ok(())
}

async fn insert_message(
    tx: &mut Transaction<'_, Postgres>,
    record: &MessageRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO appointment_messages
            (message_id, appointment_id, sender_id, sender_role, message, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(*record.message_id.as_uuid())
    .bind(*record.appointment_id.as_uuid())
    .bind(*record.sender_id.as_uuid())
    .bind(record.sender_role.as_str())
    .bind(&record.message)
    .bind(record.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl AppointmentRepository for PgRepository {
    async fn find(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        let sql = format!("{SELECT_APPOINTMENT} WHERE appointment_id = $1");
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_record().map(Appointment::from_record))
            .transpose()
    }

    async fn list(&self, scope: ListScope) -> Result<Vec<Appointment>, StoreError> {
        let (filter, user) = match scope {
            ListScope::AsClient(user) => ("WHERE client_id = $1", Some(user)),
            ListScope::AsLawyer(user) => ("WHERE lawyer_id = $1", Some(user)),
            ListScope::All => ("", None),
        };
        let sql = format!("{SELECT_APPOINTMENT} {filter} ORDER BY created_at DESC");
        let mut query = sqlx::query_as::<_, AppointmentRow>(&sql);
        if let Some(user) = user {
            query = query.bind(*user.as_uuid());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| r.into_record().map(Appointment::from_record))
            .collect()
    }

    async fn has_slot_conflict(
        &self,
        lawyer: UserId,
        slot: Slot,
        exclude: Option<AppointmentId>,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE lawyer_id = $1
                  AND appointment_date = $2
                  AND appointment_time = $3
                  AND status IN ('pending', 'negotiating', 'approved')
                  AND ($4::uuid IS NULL OR appointment_id <> $4)
             )",
        )
        .bind(*lawyer.as_uuid())
        .bind(slot.date)
        .bind(slot.time)
        .bind(exclude.map(|id| *id.as_uuid()))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(
        &self,
        appointment: &Appointment,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let r = appointment.record();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO appointments
                (appointment_id, client_id, lawyer_id, appointment_date, appointment_time,
                 subject, details, proposed_fee_cents, offered_fee_cents, final_fee_cents,
                 negotiation_note, status, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(*r.id.as_uuid())
        .bind(*r.client_id.as_uuid())
        .bind(*r.lawyer_id.as_uuid())
        .bind(r.slot.date)
        .bind(r.slot.time)
        .bind(&r.subject)
        .bind(&r.details)
        .bind(r.proposed_fee.cents())
        .bind(r.offered_fee.map(|f| f.cents()))
        .bind(r.final_fee.map(|f| f.cents()))
        .bind(&r.negotiation_note)
        .bind(r.status.as_str())
        .bind(r.version)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, r.slot))?;

        insert_messages(&mut tx, messages, r.updated_at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        appointment: &Appointment,
        expected_version: i64,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let r = appointment.record();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE appointments
             SET proposed_fee_cents = $3, offered_fee_cents = $4, final_fee_cents = $5,
                 negotiation_note = $6, status = $7, version = $8, updated_at = $9
             WHERE appointment_id = $1 AND version = $2",
        )
        .bind(*r.id.as_uuid())
        .bind(expected_version)
        .bind(r.proposed_fee.cents())
        .bind(r.offered_fee.map(|f| f.cents()))
        .bind(r.final_fee.map(|f| f.cents()))
        .bind(&r.negotiation_note)
        .bind(r.status.as_str())
        .bind(r.version)
        .bind(r.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, r.slot))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleVersion { id: r.id });
        }

        insert_messages(&mut tx, messages, r.updated_at).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MessageLog for PgRepository {
    async fn list(&self, appointment: AppointmentId) -> Result<Vec<MessageRecord>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT message_id, appointment_id, sender_id, sender_role, message, created_at
             FROM appointment_messages WHERE appointment_id = $1 ORDER BY seq",
        )
        .bind(*appointment.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MessageRow::into_record).collect()
    }

    async fn append(&self, message: &NewMessage) -> Result<MessageRecord, StoreError> {
        let record = MessageRecord::from_new(message, Utc::now());
        let mut tx = self.pool.begin().await?;
        insert_message(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }
}

#[async_trait]
impl LawyerDirectory for PgRepository {
    async fn find_lawyer(&self, id: UserId) -> Result<Option<Lawyer>, StoreError> {
        let row = sqlx::query_as::<_, LawyerRow>(
            "SELECT lawyer_id, name, hourly_rate_cents FROM lawyers WHERE lawyer_id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(LawyerRow::into_record).transpose()
    }
}

// ── Row types ───────────────────────────────────────────────────────

fn fee(cents: i64, column: &str) -> Result<Fee, StoreError> {
    Fee::from_cents(cents).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    appointment_id: Uuid,
    client_id: Uuid,
    lawyer_id: Uuid,
    appointment_date: NaiveDate,
    appointment_time: NaiveTime,
    subject: String,
    details: Option<String>,
    proposed_fee_cents: i64,
    offered_fee_cents: Option<i64>,
    final_fee_cents: Option<i64>,
    negotiation_note: Option<String>,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn into_record(self) -> Result<AppointmentRecord, StoreError> {
        let status: AppointmentStatus = self.status.parse().map_err(|e: hirelawyer_core::ValidationError| {
            tracing::error!(
                appointment_id = %self.appointment_id,
                status = %self.status,
                "unknown appointment status in database"
            );
            StoreError::Corrupt(e.to_string())
        })?;

        Ok(AppointmentRecord {
            id: AppointmentId::from_uuid(self.appointment_id),
            client_id: UserId::from_uuid(self.client_id),
            lawyer_id: UserId::from_uuid(self.lawyer_id),
            slot: Slot::new(self.appointment_date, self.appointment_time),
            subject: self.subject,
            details: self.details,
            proposed_fee: fee(self.proposed_fee_cents, "proposed_fee_cents")?,
            offered_fee: self
                .offered_fee_cents
                .map(|c| fee(c, "offered_fee_cents"))
                .transpose()?,
            final_fee: self
                .final_fee_cents
                .map(|c| fee(c, "final_fee_cents"))
                .transpose()?,
            negotiation_note: self.negotiation_note,
            status,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    message_id: Uuid,
    appointment_id: Uuid,
    sender_id: Uuid,
    sender_role: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_record(self) -> Result<MessageRecord, StoreError> {
        let sender_role: Role = self
            .sender_role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("sender_role: {e}")))?;
        Ok(MessageRecord {
            message_id: MessageId::from_uuid(self.message_id),
            appointment_id: AppointmentId::from_uuid(self.appointment_id),
            sender_id: UserId::from_uuid(self.sender_id),
            sender_role,
            message: self.message,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LawyerRow {
    lawyer_id: Uuid,
    name: String,
    hourly_rate_cents: i64,
}

impl LawyerRow {
    fn into_record(self) -> Result<Lawyer, StoreError> {
        Ok(Lawyer {
            id: UserId::from_uuid(self.lawyer_id),
            name: self.name,
            hourly_rate: fee(self.hourly_rate_cents, "hourly_rate_cents")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AppointmentRow {
        let now = Utc::now();
        AppointmentRow {
            appointment_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            lawyer_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            subject: "Lease".into(),
            details: None,
            proposed_fee_cents: 15_000,
            offered_fee_cents: Some(14_000),
            final_fee_cents: None,
            negotiation_note: None,
            status: status.into(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_to_record() {
        let record = row("negotiating").into_record().unwrap();
        assert_eq!(record.status, AppointmentStatus::Negotiating);
        assert_eq!(record.offered_fee, Some(Fee::from_cents(14_000).unwrap()));
        assert_eq!(record.slot.to_string(), "2026-02-10 10:00");
    }

    #[test]
    fn unknown_status_is_corrupt() {
        match row("archived").into_record() {
            Err(StoreError::Corrupt(msg)) => {
                assert_eq!(msg, "unknown appointment status \"archived\"")
            }
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }

    #[test]
    fn negative_cents_are_corrupt() {
        let mut r = row("pending");
        r.proposed_fee_cents = -1;
        assert!(matches!(r.into_record(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn unknown_sender_role_is_corrupt() {
        let r = MessageRow {
            message_id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sender_role: "judge".into(),
            message: "hi".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(r.into_record(), Err(StoreError::Corrupt(_))));
    }
}

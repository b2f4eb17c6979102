//! Notification persistence: the PostgreSQL notifier and inbox.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hirelawyer_core::{AppointmentId, NotificationId, UserId, ValidationError};
use hirelawyer_state::{NotificationKind, NotificationRequest};

use crate::notify::{NotificationInbox, NotificationRecord, Notifier, NotifyError};
use crate::repository::StoreError;

#[derive(Debug, Clone)]
pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let record = NotificationRecord::from_request(request, Utc::now());
        sqlx::query(
            "INSERT INTO notifications
                (notification_id, user_id, appointment_id, kind, title, body, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, false, $7)",
        )
        .bind(*record.notification_id.as_uuid())
        .bind(*record.user_id.as_uuid())
        .bind(record.appointment_id.map(|id| *id.as_uuid()))
        .bind(record.kind.as_str())
        .bind(&record.title)
        .bind(&record.body)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationInbox for PgNotifier {
    async fn list(
        &self,
        user: UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT notification_id, user_id, appointment_id, kind, title, body, is_read, created_at
             FROM notifications WHERE user_id = $1 ORDER BY seq DESC LIMIT $2",
        )
        .bind(*user.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(NotificationRow::into_record).collect()
    }

    async fn unread_count(&self, user: UserId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(*user.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(*id.as_uuid())
        .bind(*user.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND NOT is_read",
        )
        .bind(*user.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    notification_id: Uuid,
    user_id: Uuid,
    appointment_id: Option<Uuid>,
    kind: String,
    title: String,
    body: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_record(self) -> Result<NotificationRecord, StoreError> {
        let kind: NotificationKind = self
            .kind
            .parse()
            .map_err(|e: ValidationError| StoreError::Corrupt(e.to_string()))?;
        Ok(NotificationRecord {
            notification_id: NotificationId::from_uuid(self.notification_id),
            user_id: UserId::from_uuid(self.user_id),
            appointment_id: self.appointment_id.map(AppointmentId::from_uuid),
            kind,
            title: self.title,
            body: self.body,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

//! # Notifier
//!
//! Notifications are owned by the notifier, not by the booking core. The
//! core only hands over [`NotificationRequest`]s after a transition has
//! committed; a failure here never fails the transition.
//!
//! The inbox side ([`NotificationInbox`]) serves the authenticated user's
//! own notifications and is never consulted by the booking core.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use hirelawyer_core::{AppointmentId, NotificationId, UserId};
use hirelawyer_state::{NotificationKind, NotificationRequest};

use crate::repository::StoreError;

/// Inbox listings return at most this many entries.
pub const INBOX_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NotificationRecord {
    #[schema(value_type = String, format = Uuid)]
    pub notification_id: NotificationId,
    #[serde(skip)]
    pub user_id: UserId,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub appointment_id: Option<AppointmentId>,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "FEE_OFFER")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn from_request(request: &NotificationRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            notification_id: NotificationId::new(),
            user_id: request.recipient,
            appointment_id: request.appointment_id,
            kind: request.kind,
            title: request.title.clone(),
            body: request.body.clone(),
            is_read: false,
            created_at,
        }
    }
}

/// Records notifications on behalf of the booking core.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}

/// A user's view of their own notifications.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Latest notifications first, at most `limit`.
    async fn list(&self, user: UserId, limit: usize) -> Result<Vec<NotificationRecord>, StoreError>;

    async fn unread_count(&self, user: UserId) -> Result<u64, StoreError>;

    /// Returns `false` if `id` does not exist or belongs to another user.
    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError>;

    /// Returns the number of notifications that changed.
    async fn mark_all_read(&self, user: UserId) -> Result<u64, StoreError>;
}

/// Process-local notifier and inbox.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    entries: Arc<RwLock<Vec<NotificationRecord>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first.
    pub fn all(&self) -> Vec<NotificationRecord> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        self.entries
            .write()
            .push(NotificationRecord::from_request(request, Utc::now()));
        Ok(())
    }
}

#[async_trait]
impl NotificationInbox for MemoryNotifier {
    async fn list(
        &self,
        user: UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .filter(|n| n.user_id == user)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user: UserId) -> Result<u64, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|n| n.user_id == user && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        match entries
            .iter_mut()
            .find(|n| n.notification_id == id && n.user_id == user)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, StoreError> {
        let mut changed = 0;
        for n in self.entries.write().iter_mut() {
            if n.user_id == user && !n.is_read {
                n.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(recipient: UserId, title: &str) -> NotificationRequest {
        NotificationRequest {
            recipient,
            appointment_id: Some(AppointmentId::new()),
            kind: NotificationKind::FeeOffer,
            title: title.to_string(),
            body: None,
        }
    }

    #[tokio::test]
    async fn inbox_is_per_user_and_newest_first() {
        let notifier = MemoryNotifier::new();
        let alice = UserId::new();
        let bob = UserId::new();
        notifier.notify(&request(alice, "first")).await.unwrap();
        notifier.notify(&request(bob, "other")).await.unwrap();
        notifier.notify(&request(alice, "second")).await.unwrap();

        let inbox = notifier.list(alice, INBOX_LIMIT).await.unwrap();
        let titles: Vec<_> = inbox.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(notifier.unread_count(alice).await.unwrap(), 2);
        assert_eq!(notifier.list(alice, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_read_is_scoped_to_owner() {
        let notifier = MemoryNotifier::new();
        let alice = UserId::new();
        let bob = UserId::new();
        notifier.notify(&request(alice, "a")).await.unwrap();
        let id = notifier.all()[0].notification_id;

        assert!(!notifier.mark_read(bob, id).await.unwrap());
        assert!(notifier.mark_read(alice, id).await.unwrap());
        assert_eq!(notifier.unread_count(alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_all_read_counts_changes() {
        let notifier = MemoryNotifier::new();
        let alice = UserId::new();
        for _ in 0..3 {
            notifier.notify(&request(alice, "n")).await.unwrap();
        }
        assert_eq!(notifier.mark_all_read(alice).await.unwrap(), 3);
        assert_eq!(notifier.mark_all_read(alice).await.unwrap(), 0);
    }

    #[test]
    fn record_serializes_kind_as_type() {
        let record = NotificationRecord::from_request(&request(UserId::new(), "t"), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "FEE_OFFER");
        assert!(json.get("user_id").is_none());
    }
}

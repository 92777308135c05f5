//! Notification persistence

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{NewNotification, Notification};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Id),
    #[error("Database error: {0}")]
    Database(String),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

impl From<NotificationError> for FoError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => FoError::not_found("Notification", id),
            NotificationError::Database(message) => FoError::Database(message),
        }
    }
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> NotificationResult<Notification>;

    async fn find(&self, id: Id) -> NotificationResult<Option<Notification>>;

    /// Newest first
    async fn list_for(
        &self,
        recipient_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> NotificationResult<PaginatedResult<Notification>>;

    /// Marking an already read notification keeps its original `read_at`
    async fn mark_read(&self, id: Id) -> NotificationResult<Notification>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, recipient_id: Id) -> NotificationResult<u64>;

    async fn unread_count(&self, recipient_id: Id) -> NotificationResult<i64>;
}

/// In-memory notification store for development/testing
pub struct MemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
    next_id: AtomicI64,
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            notifications: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: NewNotification) -> NotificationResult<Notification> {
        let created = Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            recipient_id: notification.recipient_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            link: notification.link,
            read_at: None,
            created_at: Utc::now(),
        };
        self.notifications.write().await.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: Id) -> NotificationResult<Option<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn list_for(
        &self,
        recipient_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> NotificationResult<PaginatedResult<Notification>> {
        let notifications = self.notifications.read().await;
        let matching: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .filter(|n| !unread_only || !n.is_read())
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(matching), total, pagination))
    }

    async fn mark_read(&self, id: Id) -> NotificationResult<Notification> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NotificationError::NotFound(id))?;
        if notification.read_at.is_none() {
            notification.read_at = Some(Utc::now());
        }
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, recipient_id: Id) -> NotificationResult<u64> {
        let mut notifications = self.notifications.write().await;
        let now = Utc::now();
        let mut count = 0;
        for notification in notifications.iter_mut() {
            if notification.recipient_id == recipient_id && notification.read_at.is_none() {
                notification.read_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn unread_count(&self, recipient_id: Id) -> NotificationResult<i64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read())
            .count() as i64)
    }
}

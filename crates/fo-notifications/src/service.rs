//! Notification service
//!
//! Stores notifications and pushes them to live subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use fo_core::error::FoError;
use fo_core::result::FoResult;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{NewNotification, Notification};
use tracing::{debug, instrument};

use crate::hub::NotificationHub;
use crate::store::{NotificationResult, NotificationStore};

/// What business services use to tell a user something
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> NotificationResult<Notification>;
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, hub: NotificationHub) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub async fn list(
        &self,
        recipient_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<Notification>> {
        Ok(self
            .store
            .list_for(recipient_id, unread_only, pagination)
            .await?)
    }

    /// Only the recipient may mark a notification; anyone else sees 404
    #[instrument(skip(self))]
    pub async fn mark_read(&self, recipient_id: Id, id: Id) -> FoResult<Notification> {
        match self.store.find(id).await? {
            Some(n) if n.recipient_id == recipient_id => Ok(self.store.mark_read(id).await?),
            _ => Err(FoError::not_found("Notification", id)),
        }
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, recipient_id: Id) -> FoResult<u64> {
        let count = self.store.mark_all_read(recipient_id).await?;
        debug!(recipient_id, count, "Notifications marked read");
        Ok(count)
    }

    pub async fn unread_count(&self, recipient_id: Id) -> FoResult<i64> {
        Ok(self.store.unread_count(recipient_id).await?)
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    #[instrument(skip(self, notification), fields(recipient = notification.recipient_id, kind = %notification.kind))]
    async fn notify(&self, notification: NewNotification) -> NotificationResult<Notification> {
        let created = self.store.insert(notification).await?;
        let delivered = self.hub.publish(created.clone());
        debug!(id = created.id, delivered, "Notification created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNotificationStore;
    use fo_models::NotificationKind;

    fn service() -> NotificationService {
        NotificationService::new(Arc::new(MemoryNotificationStore::new()), NotificationHub::default())
    }

    fn assigned(recipient_id: Id, number: &str) -> NewNotification {
        NewNotification {
            recipient_id,
            kind: NotificationKind::WorkOrderAssigned,
            title: format!("Work order {number} assigned to you"),
            message: "Replace boiler valve".into(),
            link: Some("/work-orders/10".into()),
        }
    }

    #[tokio::test]
    async fn test_notify_stores_and_publishes() {
        let service = service();
        let mut stream = service.hub().subscribe(5);

        let created = service.notify(assigned(5, "WO-2024-00010")).await.unwrap();
        assert!(!created.is_read());

        let live = stream.next().await.unwrap();
        assert_eq!(live.id, created.id);
        assert_eq!(service.unread_count(5).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_filter() {
        let service = service();
        let first = service.notify(assigned(5, "WO-2024-00001")).await.unwrap();
        service.notify(assigned(5, "WO-2024-00002")).await.unwrap();
        service.notify(assigned(6, "WO-2024-00003")).await.unwrap();

        let read = service.mark_read(5, first.id).await.unwrap();
        assert!(read.is_read());

        let unread = service.list(5, true, Pagination::default()).await.unwrap();
        assert_eq!(unread.total, 1);
        assert_eq!(unread.items[0].title, "Work order WO-2024-00002 assigned to you");

        let all = service.list(5, false, Pagination::default()).await.unwrap();
        assert_eq!(all.total, 2);

        assert_eq!(service.mark_all_read(5).await.unwrap(), 1);
        assert_eq!(service.unread_count(5).await.unwrap(), 0);
        assert_eq!(service.unread_count(6).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cannot_mark_someone_elses_notification() {
        let service = service();
        let other = service.notify(assigned(6, "WO-2024-00003")).await.unwrap();
        let err = service.mark_read(5, other.id).await.unwrap_err();
        assert!(matches!(err, FoError::NotFound { .. }));
    }
}

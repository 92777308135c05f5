//! PostgreSQL notification store

use async_trait::async_trait;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{NewNotification, Notification};
use fo_notifications::{NotificationError, NotificationResult, NotificationStore};
use sqlx::PgPool;

const COLUMNS: &str = "id, recipient_id, kind, title, message, link, read_at, created_at";

fn store_error(err: sqlx::Error) -> NotificationError {
    NotificationError::Database(err.to_string())
}

pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: NewNotification) -> NotificationResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications (recipient_id, kind, title, message, link) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(notification.recipient_id)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.link)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn find(&self, id: Id) -> NotificationResult<Option<Notification>> {
        let sql = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn list_for(
        &self,
        recipient_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> NotificationResult<PaginatedResult<Notification>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM notifications WHERE recipient_id = $1 AND (NOT $2 OR read_at IS NULL) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Notification>(&sql)
            .bind(recipient_id)
            .bind(unread_only)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND (NOT $2 OR read_at IS NULL)",
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn mark_read(&self, id: Id) -> NotificationResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW()) WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .ok_or(NotificationError::NotFound(id))
    }

    async fn mark_all_read(&self, recipient_id: Id) -> NotificationResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE recipient_id = $1 AND read_at IS NULL")
            .bind(recipient_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, recipient_id: Id) -> NotificationResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read_at IS NULL")
            .bind(recipient_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }
}

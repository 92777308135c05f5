//! PostgreSQL attachment metadata store

use async_trait::async_trait;
use fo_attachments::{AttachmentError, AttachmentResult, AttachmentStore};
use fo_core::traits::Id;
use fo_models::{Attachment, AttachmentContainer, NewAttachment};
use sqlx::PgPool;

const COLUMNS: &str = "id, container_type, container_id, file_name, stored_name, content_type, size, \
                       digest, url, created_at, updated_at, created_by_id, updated_by_id, deleted_at";

fn store_error(err: sqlx::Error) -> AttachmentError {
    AttachmentError::Database(err.to_string())
}

pub struct PgAttachmentStore {
    pool: PgPool,
}

impl PgAttachmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentStore for PgAttachmentStore {
    async fn create(&self, input: NewAttachment, actor: Option<Id>) -> AttachmentResult<Attachment> {
        let sql = format!(
            r#"
            INSERT INTO attachments (
                container_type, container_id, file_name, stored_name, content_type, size, digest, url,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Attachment>(&sql)
            .bind(input.container_type.as_str())
            .bind(input.container_id)
            .bind(&input.file_name)
            .bind(&input.stored_name)
            .bind(&input.content_type)
            .bind(input.size)
            .bind(&input.digest)
            .bind(&input.url)
            .bind(actor)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn find_by_id(&self, id: Id) -> AttachmentResult<Option<Attachment>> {
        let sql = format!("SELECT {COLUMNS} FROM attachments WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Attachment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn list_for(&self, container: AttachmentContainer, container_id: Id) -> AttachmentResult<Vec<Attachment>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM attachments WHERE container_type = $1 AND container_id = $2 \
             AND deleted_at IS NULL ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Attachment>(&sql)
            .bind(container.as_str())
            .bind(container_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> AttachmentResult<()> {
        let result = sqlx::query(
            "UPDATE attachments SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AttachmentError::NotFound(id));
        }
        Ok(())
    }
}

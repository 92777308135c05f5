//! Document template store

use async_trait::async_trait;
use fo_core::traits::Id;
use fo_models::{DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate};
use sqlx::PgPool;

use crate::repository::{Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait DocumentTemplateStore: Repository<DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate> {
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<DocumentTemplate>>;

    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;
}

const COLUMNS: &str = "id, code, name, category, content, is_active, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgDocumentTemplateStore {
    pool: PgPool,
}

impl PgDocumentTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate> for PgDocumentTemplateStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<DocumentTemplate>> {
        let sql = format!("SELECT {COLUMNS} FROM document_templates WHERE id = $1 AND deleted_at IS NULL");
        let template = sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(template)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<DocumentTemplate>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM document_templates WHERE deleted_at IS NULL \
             ORDER BY name LIMIT $1 OFFSET $2"
        );
        let templates = sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(templates)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM document_templates WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewDocumentTemplate, actor: Option<Id>) -> RepositoryResult<DocumentTemplate> {
        let sql = format!(
            r#"
            INSERT INTO document_templates (code, name, category, content, is_active, created_by_id, updated_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {COLUMNS}
            "#
        );
        let template = sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(&dto.category)
            .bind(&dto.content)
            .bind(dto.is_active.unwrap_or(true))
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(template)
    }

    async fn update(
        &self,
        id: Id,
        dto: UpdateDocumentTemplate,
        actor: Option<Id>,
    ) -> RepositoryResult<DocumentTemplate> {
        let sql = format!(
            r#"
            UPDATE document_templates SET
                name = COALESCE($1, name),
                category = CASE WHEN $7 THEN $2 ELSE category END,
                content = COALESCE($3, content),
                is_active = COALESCE($4, is_active),
                updated_by_id = $5,
                updated_at = NOW()
            WHERE id = $6 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(&dto.name)
            .bind(dto.category.clone().flatten())
            .bind(&dto.content)
            .bind(dto.is_active)
            .bind(actor)
            .bind(id)
            .bind(dto.category.is_some())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("DocumentTemplate", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE document_templates SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("DocumentTemplate", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<DocumentTemplate> {
        let sql = format!(
            "UPDATE document_templates SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("DocumentTemplate", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM document_templates WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl DocumentTemplateStore for PgDocumentTemplateStore {
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<DocumentTemplate>> {
        let sql = format!("SELECT {COLUMNS} FROM document_templates WHERE code = $1 AND deleted_at IS NULL");
        let template = sqlx::query_as::<_, DocumentTemplate>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(template)
    }

    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM document_templates WHERE code = $1 \
             AND deleted_at IS NULL AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }
}

//! Lookup store
//!
//! Soft-deleted lookups are invisible to every query here, including the
//! code uniqueness check.

use async_trait::async_trait;
use fo_core::traits::Id;
use fo_models::{Lookup, LookupKind, NewLookup, UpdateLookup};
use sqlx::PgPool;

use crate::repository::{Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait LookupStore: Repository<Lookup, NewLookup, UpdateLookup> {
    /// Ordered by sort order, then name
    async fn list(&self, kind: LookupKind, include_inactive: bool) -> RepositoryResult<Vec<Lookup>>;

    async fn find_by_code(&self, kind: LookupKind, code: &str) -> RepositoryResult<Option<Lookup>>;

    async fn is_code_unique(&self, kind: LookupKind, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;
}

const COLUMNS: &str = "id, kind, code, name, sort_order, is_active, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgLookupStore {
    pool: PgPool,
}

impl PgLookupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Lookup, NewLookup, UpdateLookup> for PgLookupStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Lookup>> {
        let sql = format!("SELECT {COLUMNS} FROM lookups WHERE id = $1 AND deleted_at IS NULL");
        let lookup = sqlx::query_as::<_, Lookup>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lookup)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Lookup>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM lookups WHERE deleted_at IS NULL \
             ORDER BY kind, sort_order, name LIMIT $1 OFFSET $2"
        );
        let lookups = sqlx::query_as::<_, Lookup>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(lookups)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lookups WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewLookup, actor: Option<Id>) -> RepositoryResult<Lookup> {
        let sql = format!(
            r#"
            INSERT INTO lookups (kind, code, name, sort_order, is_active, created_by_id, updated_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {COLUMNS}
            "#
        );
        let lookup = sqlx::query_as::<_, Lookup>(&sql)
            .bind(dto.kind.as_str())
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(dto.sort_order)
            .bind(dto.is_active)
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(lookup)
    }

    async fn update(&self, id: Id, dto: UpdateLookup, actor: Option<Id>) -> RepositoryResult<Lookup> {
        let sql = format!(
            r#"
            UPDATE lookups SET
                name = COALESCE($1, name),
                sort_order = COALESCE($2, sort_order),
                is_active = COALESCE($3, is_active),
                updated_by_id = $4,
                updated_at = NOW()
            WHERE id = $5 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Lookup>(&sql)
            .bind(&dto.name)
            .bind(dto.sort_order)
            .bind(dto.is_active)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Lookup", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE lookups SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Lookup", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Lookup> {
        let sql = format!(
            "UPDATE lookups SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lookup>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Lookup", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM lookups WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl LookupStore for PgLookupStore {
    async fn list(&self, kind: LookupKind, include_inactive: bool) -> RepositoryResult<Vec<Lookup>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM lookups WHERE kind = $1 AND deleted_at IS NULL \
             AND ($2 OR is_active) ORDER BY sort_order, name"
        );
        let lookups = sqlx::query_as::<_, Lookup>(&sql)
            .bind(kind.as_str())
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(lookups)
    }

    async fn find_by_code(&self, kind: LookupKind, code: &str) -> RepositoryResult<Option<Lookup>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM lookups WHERE kind = $1 AND code = $2 AND deleted_at IS NULL"
        );
        let lookup = sqlx::query_as::<_, Lookup>(&sql)
            .bind(kind.as_str())
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lookup)
    }

    async fn is_code_unique(&self, kind: LookupKind, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM lookups WHERE kind = $1 AND code = $2 \
             AND deleted_at IS NULL AND ($3::BIGINT IS NULL OR id <> $3))",
        )
        .bind(kind.as_str())
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }
}

//! Client material store

use async_trait::async_trait;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{ClientMaterial, NewClientMaterial, UpdateClientMaterial};
use sqlx::PgPool;

use crate::repository::{Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait ClientMaterialStore: Repository<ClientMaterial, NewClientMaterial, UpdateClientMaterial> {
    /// Ordered by code
    async fn find_by_client(
        &self,
        client_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ClientMaterial>>;

    /// Codes are unique per client
    async fn is_code_unique(&self, client_id: Id, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;
}

const COLUMNS: &str = "id, client_id, code, name, description, unit, unit_price, is_active, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgClientMaterialStore {
    pool: PgPool,
}

impl PgClientMaterialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<ClientMaterial, NewClientMaterial, UpdateClientMaterial> for PgClientMaterialStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ClientMaterial>> {
        let sql = format!("SELECT {COLUMNS} FROM client_materials WHERE id = $1 AND deleted_at IS NULL");
        let material = sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(material)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ClientMaterial>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM client_materials WHERE deleted_at IS NULL \
             ORDER BY client_id, code LIMIT $1 OFFSET $2"
        );
        let materials = sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(materials)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM client_materials WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewClientMaterial, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        let sql = format!(
            r#"
            INSERT INTO client_materials (
                client_id, code, name, description, unit, unit_price, is_active,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "#
        );
        let material = sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(dto.client_id)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(&dto.description)
            .bind(&dto.unit)
            .bind(dto.unit_price)
            .bind(dto.is_active.unwrap_or(true))
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(material)
    }

    async fn update(&self, id: Id, dto: UpdateClientMaterial, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        let sql = format!(
            r#"
            UPDATE client_materials SET
                code = COALESCE($1, code),
                name = COALESCE($2, name),
                description = CASE WHEN $9 THEN $3 ELSE description END,
                unit = COALESCE($4, unit),
                unit_price = CASE WHEN $10 THEN $5 ELSE unit_price END,
                is_active = COALESCE($6, is_active),
                updated_by_id = $7,
                updated_at = NOW()
            WHERE id = $8 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(dto.description.clone().flatten())
            .bind(&dto.unit)
            .bind(dto.unit_price.flatten())
            .bind(dto.is_active)
            .bind(actor)
            .bind(id)
            .bind(dto.description.is_some())
            .bind(dto.unit_price.is_some())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("ClientMaterial", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE client_materials SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("ClientMaterial", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        let sql = format!(
            "UPDATE client_materials SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("ClientMaterial", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM client_materials WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ClientMaterialStore for PgClientMaterialStore {
    async fn find_by_client(
        &self,
        client_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ClientMaterial>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM client_materials WHERE client_id = $1 AND deleted_at IS NULL \
             ORDER BY code ASC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, ClientMaterial>(&sql)
            .bind(client_id)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM client_materials WHERE client_id = $1 AND deleted_at IS NULL",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn is_code_unique(&self, client_id: Id, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM client_materials WHERE client_id = $1 AND code = $2 \
             AND deleted_at IS NULL AND ($3::BIGINT IS NULL OR id <> $3))",
        )
        .bind(client_id)
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }
}

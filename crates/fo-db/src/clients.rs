//! Client and client contact store

use async_trait::async_trait;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{Client, ClientContact, NewClient, NewClientContact, UpdateClient, UpdateClientContact};
use sqlx::PgPool;

use crate::repository::{like_pattern, Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait ClientStore: Repository<Client, NewClient, UpdateClient> {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    /// Free text over code and name
    async fn search(
        &self,
        q: Option<&str>,
        active: Option<bool>,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<Client>>;

    /// Primary first, then by name
    async fn list_contacts(&self, client_id: Id) -> RepositoryResult<Vec<ClientContact>>;

    async fn find_contact(&self, id: Id) -> RepositoryResult<Option<ClientContact>>;

    /// A primary contact demotes the client's other contacts
    async fn create_contact(&self, dto: NewClientContact, actor: Option<Id>) -> RepositoryResult<ClientContact>;

    async fn update_contact(
        &self,
        id: Id,
        dto: UpdateClientContact,
        actor: Option<Id>,
    ) -> RepositoryResult<ClientContact>;

    async fn delete_contact(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()>;
}

const CLIENT_COLUMNS: &str = "id, code, name, tax_number, email, phone, address, is_active, \
                              created_at, updated_at, created_by_id, updated_by_id, deleted_at";

const CONTACT_COLUMNS: &str = "id, client_id, full_name, position, email, phone, is_primary, \
                               created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn demote_other_contacts(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        client_id: Id,
        keep_id: Id,
    ) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE client_contacts SET is_primary = FALSE, updated_at = NOW() \
             WHERE client_id = $1 AND id <> $2 AND is_primary AND deleted_at IS NULL",
        )
        .bind(client_id)
        .bind(keep_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<Client, NewClient, UpdateClient> for PgClientStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND deleted_at IS NULL");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL ORDER BY name ASC LIMIT $1 OFFSET $2"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewClient, actor: Option<Id>) -> RepositoryResult<Client> {
        let sql = format!(
            r#"
            INSERT INTO clients (
                code, name, tax_number, email, phone, address, is_active,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(&dto.tax_number)
            .bind(&dto.email)
            .bind(&dto.phone)
            .bind(&dto.address)
            .bind(dto.is_active.unwrap_or(true))
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(client)
    }

    async fn update(&self, id: Id, dto: UpdateClient, actor: Option<Id>) -> RepositoryResult<Client> {
        let sql = format!(
            r#"
            UPDATE clients SET
                code = COALESCE($1, code),
                name = COALESCE($2, name),
                tax_number = CASE WHEN $10 THEN $3 ELSE tax_number END,
                email = CASE WHEN $11 THEN $4 ELSE email END,
                phone = CASE WHEN $12 THEN $5 ELSE phone END,
                address = CASE WHEN $13 THEN $6 ELSE address END,
                is_active = COALESCE($7, is_active),
                updated_by_id = $8,
                updated_at = NOW()
            WHERE id = $9 AND deleted_at IS NULL
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(dto.tax_number.clone().flatten())
            .bind(dto.email.clone().flatten())
            .bind(dto.phone.clone().flatten())
            .bind(dto.address.clone().flatten())
            .bind(dto.is_active)
            .bind(actor)
            .bind(id)
            .bind(dto.tax_number.is_some())
            .bind(dto.email.is_some())
            .bind(dto.phone.is_some())
            .bind(dto.address.is_some())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Client", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE clients SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Client", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Client> {
        let sql = format!(
            "UPDATE clients SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {CLIENT_COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Client", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM clients WHERE code = $1 AND deleted_at IS NULL \
             AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }

    async fn search(
        &self,
        q: Option<&str>,
        active: Option<bool>,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<Client>> {
        let pattern = q.filter(|q| !q.trim().is_empty()).map(like_pattern);
        let condition = "deleted_at IS NULL AND ($1::TEXT IS NULL OR code ILIKE $1 OR name ILIKE $1) \
                         AND ($2::BOOLEAN IS NULL OR is_active = $2)";

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE {condition} ORDER BY name ASC LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Client>(&sql)
            .bind(&pattern)
            .bind(active)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM clients WHERE {condition}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&pattern)
            .bind(active)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn list_contacts(&self, client_id: Id) -> RepositoryResult<Vec<ClientContact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM client_contacts WHERE client_id = $1 AND deleted_at IS NULL \
             ORDER BY is_primary DESC, full_name ASC"
        );
        let contacts = sqlx::query_as::<_, ClientContact>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn find_contact(&self, id: Id) -> RepositoryResult<Option<ClientContact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM client_contacts WHERE id = $1 AND deleted_at IS NULL");
        let contact = sqlx::query_as::<_, ClientContact>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn create_contact(&self, dto: NewClientContact, actor: Option<Id>) -> RepositoryResult<ClientContact> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO client_contacts (
                client_id, full_name, position, email, phone, is_primary,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let contact = sqlx::query_as::<_, ClientContact>(&sql)
            .bind(dto.client_id)
            .bind(&dto.full_name)
            .bind(&dto.position)
            .bind(&dto.email)
            .bind(&dto.phone)
            .bind(dto.is_primary)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await?;

        if contact.is_primary {
            Self::demote_other_contacts(&mut tx, contact.client_id, contact.id).await?;
        }
        tx.commit().await?;
        Ok(contact)
    }

    async fn update_contact(
        &self,
        id: Id,
        dto: UpdateClientContact,
        actor: Option<Id>,
    ) -> RepositoryResult<ClientContact> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE client_contacts SET
                full_name = COALESCE($1, full_name),
                position = CASE WHEN $8 THEN $2 ELSE position END,
                email = CASE WHEN $9 THEN $3 ELSE email END,
                phone = CASE WHEN $10 THEN $4 ELSE phone END,
                is_primary = COALESCE($5, is_primary),
                updated_by_id = $6,
                updated_at = NOW()
            WHERE id = $7 AND deleted_at IS NULL
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let contact = sqlx::query_as::<_, ClientContact>(&sql)
            .bind(&dto.full_name)
            .bind(dto.position.clone().flatten())
            .bind(dto.email.clone().flatten())
            .bind(dto.phone.clone().flatten())
            .bind(dto.is_primary)
            .bind(actor)
            .bind(id)
            .bind(dto.position.is_some())
            .bind(dto.email.is_some())
            .bind(dto.phone.is_some())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::not_found("ClientContact", id))?;

        if dto.is_primary == Some(true) {
            Self::demote_other_contacts(&mut tx, contact.client_id, contact.id).await?;
        }
        tx.commit().await?;
        Ok(contact)
    }

    async fn delete_contact(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE client_contacts SET deleted_at = NOW(), is_primary = FALSE, updated_by_id = $1, \
             updated_at = NOW() WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("ClientContact", id));
        }
        Ok(())
    }
}

//! Role and permission store

use async_trait::async_trait;
use fo_core::traits::Id;
use fo_models::{NewPermission, NewRole, Permission, Role, UpdateRole};
use sqlx::PgPool;

use crate::repository::{Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait RoleStore: Repository<Role, NewRole, UpdateRole> {
    /// Case-insensitive
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Role>>;

    async fn is_name_unique(&self, name: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    /// Replace the role's permission codes
    async fn set_permissions(&self, role_id: Id, permissions: &[String]) -> RepositoryResult<Role>;

    /// The catalog, ordered by category then code
    async fn list_permissions(&self) -> RepositoryResult<Vec<Permission>>;

    async fn upsert_permission(&self, permission: NewPermission) -> RepositoryResult<Permission>;

    /// Distinct permission codes granted by the named roles
    async fn permissions_for_roles(&self, roles: &[String]) -> RepositoryResult<Vec<String>>;
}

const SELECT_ROLE: &str = r#"
    SELECT r.id, r.name, r.description, r.is_system,
           ARRAY(
               SELECT rp.permission_code FROM role_permissions rp
               WHERE rp.role_id = r.id ORDER BY rp.permission_code
           ) AS permissions,
           r.created_at, r.updated_at, r.created_by_id, r.updated_by_id, r.deleted_at
    FROM roles r
"#;

pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Id) -> RepositoryResult<Role> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Role", id))
    }

    async fn replace_permissions(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        role_id: Id,
        permissions: &[String],
    ) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_code)
            SELECT $1, p.code FROM permissions p WHERE p.code = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permissions)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository<Role, NewRole, UpdateRole> for PgRoleStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Role>> {
        let sql = format!("{SELECT_ROLE} WHERE r.id = $1 AND r.deleted_at IS NULL");
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Role>> {
        let sql = format!("{SELECT_ROLE} WHERE r.deleted_at IS NULL ORDER BY r.name ASC LIMIT $1 OFFSET $2");
        let roles = sqlx::query_as::<_, Role>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewRole, actor: Option<Id>) -> RepositoryResult<Role> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, Id>(
            r#"
            INSERT INTO roles (name, description, is_system, created_by_id, updated_by_id)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.is_system)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_permissions(&mut tx, id, &dto.permissions).await?;
        tx.commit().await?;

        self.fetch(id).await
    }

    async fn update(&self, id: Id, dto: UpdateRole, actor: Option<Id>) -> RepositoryResult<Role> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE roles SET
                name = COALESCE($1, name),
                description = CASE WHEN $5 THEN $2 ELSE description END,
                updated_by_id = $3,
                updated_at = NOW()
            WHERE id = $4 AND deleted_at IS NULL
            "#,
        )
        .bind(&dto.name)
        .bind(dto.description.clone().flatten())
        .bind(actor)
        .bind(id)
        .bind(dto.description.is_some())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Role", id));
        }
        if let Some(permissions) = &dto.permissions {
            Self::replace_permissions(&mut tx, id, permissions).await?;
        }
        tx.commit().await?;

        self.fetch(id).await
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Role", id));
        }

        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Role> {
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Role", id));
        }
        self.fetch(id).await
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Role>> {
        let sql = format!("{SELECT_ROLE} WHERE LOWER(r.name) = LOWER($1) AND r.deleted_at IS NULL");
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn is_name_unique(&self, name: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM roles WHERE LOWER(name) = LOWER($1) \
             AND deleted_at IS NULL AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }

    async fn set_permissions(&self, role_id: Id, permissions: &[String]) -> RepositoryResult<Role> {
        let mut tx = self.pool.begin().await?;
        Self::replace_permissions(&mut tx, role_id, permissions).await?;
        tx.commit().await?;
        self.fetch(role_id).await
    }

    async fn list_permissions(&self) -> RepositoryResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, category FROM permissions ORDER BY category, code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    async fn upsert_permission(&self, permission: NewPermission) -> RepositoryResult<Permission> {
        let row = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (code, name, category) VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category
            RETURNING id, code, name, category
            "#,
        )
        .bind(&permission.code)
        .bind(&permission.name)
        .bind(&permission.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn permissions_for_roles(&self, roles: &[String]) -> RepositoryResult<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT rp.permission_code FROM role_permissions rp
            JOIN roles r ON r.id = rp.role_id AND r.deleted_at IS NULL
            WHERE r.name = ANY($1)
            ORDER BY rp.permission_code
            "#,
        )
        .bind(roles)
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }
}

//! User store
//!
//! Role names are aggregated into `User::roles` from `user_roles`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{UpdateUser, User};
use sqlx::PgPool;

use crate::repository::{like_pattern, Repository, RepositoryError, RepositoryResult};

/// Insert data for a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub employee_id: Option<Id>,
}

#[async_trait]
pub trait UserStore: Repository<User, CreateUserDto, UpdateUser> {
    /// Case-insensitive
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Case-insensitive
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Option<User>>;

    async fn is_username_unique(&self, username: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    /// Replace the user's roles by name
    async fn set_roles(&self, user_id: Id, roles: &[String]) -> RepositoryResult<User>;

    /// Clears the failure counter
    async fn record_login_success(&self, id: Id) -> RepositoryResult<()>;

    /// Counts a failed login. A previous failure older than `window_start`
    /// restarts the count at one.
    async fn record_login_failure(&self, id: Id, window_start: DateTime<Utc>) -> RepositoryResult<User>;

    async fn update_password_hash(&self, id: Id, password_hash: &str, actor: Option<Id>) -> RepositoryResult<()>;

    /// Free text over username, email and names
    async fn search(&self, q: Option<&str>, pagination: Pagination) -> RepositoryResult<PaginatedResult<User>>;
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password_hash,
           u.is_active, u.employee_id, u.failed_login_count, u.last_failed_login_at,
           u.last_login_at,
           ARRAY(
               SELECT r.name FROM user_roles ur
               JOIN roles r ON r.id = ur.role_id AND r.deleted_at IS NULL
               WHERE ur.user_id = u.id
               ORDER BY r.name
           ) AS roles,
           u.created_at, u.updated_at, u.created_by_id, u.updated_by_id, u.deleted_at
    FROM users u
"#;

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Id) -> RepositoryResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User", id))
    }

    async fn find_where(&self, condition: &str, value: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE {condition} AND u.deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn is_unique(&self, column: &str, value: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let sql = format!(
            "SELECT NOT EXISTS(SELECT 1 FROM users WHERE LOWER({column}) = LOWER($1) \
             AND deleted_at IS NULL AND ($2::BIGINT IS NULL OR id <> $2))"
        );
        let unique = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(unique)
    }
}

#[async_trait]
impl Repository<User, CreateUserDto, UpdateUser> for PgUserStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE u.id = $1 AND u.deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<User>> {
        let sql = format!(
            "{SELECT_USER} WHERE u.deleted_at IS NULL ORDER BY u.username ASC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateUserDto, actor: Option<Id>) -> RepositoryResult<User> {
        let id = sqlx::query_scalar::<_, Id>(
            r#"
            INSERT INTO users (
                username, email, first_name, last_name, password_hash, is_active,
                employee_id, created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id
            "#,
        )
        .bind(&dto.username)
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.password_hash)
        .bind(dto.is_active)
        .bind(dto.employee_id)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        self.fetch(id).await
    }

    async fn update(&self, id: Id, dto: UpdateUser, actor: Option<Id>) -> RepositoryResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE($1, email),
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                is_active = COALESCE($4, is_active),
                employee_id = CASE WHEN $8 THEN $5 ELSE employee_id END,
                updated_by_id = $6,
                updated_at = NOW()
            WHERE id = $7 AND deleted_at IS NULL
            "#,
        )
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.is_active)
        .bind(dto.employee_id.flatten())
        .bind(actor)
        .bind(id)
        .bind(dto.employee_id.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        self.fetch(id).await
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), is_active = FALSE, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<User> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        self.fetch(id).await
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.find_where("LOWER(u.username) = LOWER($1)", username).await
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.find_where("LOWER(u.email) = LOWER($1)", email).await
    }

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE u.employee_id = $1 AND u.deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn is_username_unique(&self, username: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        self.is_unique("username", username, exclude_id).await
    }

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        self.is_unique("email", email, exclude_id).await
    }

    async fn set_roles(&self, user_id: Id, roles: &[String]) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r
            WHERE r.name = ANY($2) AND r.deleted_at IS NULL
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(roles)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.fetch(user_id).await
    }

    async fn record_login_success(&self, id: Id) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE users SET failed_login_count = 0, last_failed_login_at = NULL, last_login_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_login_failure(&self, id: Id, window_start: DateTime<Utc>) -> RepositoryResult<User> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_count = CASE
                    WHEN last_failed_login_at IS NULL OR last_failed_login_at < $1 THEN 1
                    ELSE failed_login_count + 1
                END,
                last_failed_login_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(window_start)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.fetch(id).await
    }

    async fn update_password_hash(&self, id: Id, password_hash: &str, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_by_id = $2, updated_at = NOW() \
             WHERE id = $3 AND deleted_at IS NULL",
        )
        .bind(password_hash)
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    async fn search(&self, q: Option<&str>, pagination: Pagination) -> RepositoryResult<PaginatedResult<User>> {
        let pattern = q.filter(|q| !q.trim().is_empty()).map(like_pattern);
        let condition = "u.deleted_at IS NULL AND ($1::TEXT IS NULL OR u.username ILIKE $1 \
                         OR u.email ILIKE $1 OR u.first_name ILIKE $1 OR u.last_name ILIKE $1)";

        let sql = format!("{SELECT_USER} WHERE {condition} ORDER BY u.username ASC LIMIT $2 OFFSET $3");
        let items = sqlx::query_as::<_, User>(&sql)
            .bind(&pattern)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM users u WHERE {condition}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }
}

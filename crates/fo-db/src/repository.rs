//! Repository traits and shared helpers
//!
//! Every store excludes soft-deleted rows from reads. `delete` only sets
//! `deleted_at`; `restore` clears it again.

use async_trait::async_trait;
use fo_core::error::{FoError, ValidationErrors};
use fo_core::pagination::SortParam;
use fo_core::traits::Id;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        RepositoryError::NotFound { entity, id }
    }

    /// A single-field validation failure
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        RepositoryError::Validation(errors)
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            RepositoryError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }
}

impl From<RepositoryError> for FoError {
    fn from(err: RepositoryError) -> Self {
        if err.is_unique_violation() {
            return FoError::conflict("A record with the same key already exists");
        }
        match err {
            RepositoryError::NotFound { entity, id } => FoError::not_found(entity, id),
            RepositoryError::Validation(errors) => FoError::Validation(errors),
            RepositoryError::Conflict(message) => FoError::conflict(message),
            RepositoryError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                FoError::Database(e.to_string())
            }
        }
    }
}

/// Generic CRUD over one table
#[async_trait]
pub trait Repository<T, CreateDto, UpdateDto>: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<T>>;

    async fn count(&self) -> RepositoryResult<i64>;

    async fn create(&self, dto: CreateDto, actor: Option<Id>) -> RepositoryResult<T>;

    async fn update(&self, id: Id, dto: UpdateDto, actor: Option<Id>) -> RepositoryResult<T>;

    /// Soft delete
    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()>;

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<T>;

    async fn exists(&self, id: Id) -> RepositoryResult<bool>;
}

/// Builds an ORDER BY list from API sort fields. Unknown fields are dropped.
pub fn order_by(sorts: &[SortParam], columns: &[(&str, &str)], fallback: &str) -> String {
    let mut parts: Vec<String> = sorts
        .iter()
        .filter_map(|sort| {
            columns
                .iter()
                .find(|(field, _)| *field == sort.field)
                .map(|(_, column)| format!("{} {}", column, sort.direction.as_sql()))
        })
        .collect();
    parts.push(fallback.to_string());
    parts.join(", ")
}

/// `%term%` for ILIKE, with wildcards in the term escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//! Resource store
//!
//! Assignment writes keep the resource status in step: creating an
//! assignment marks the resource in use, releasing it makes the resource
//! available again.

use async_trait::async_trait;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{NewResource, NewResourceAssignment, Resource, ResourceAssignment, ResourceFilter, ResourceStatus, UpdateResource};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::repository::{like_pattern, Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait ResourceStore: Repository<Resource, NewResource, UpdateResource> {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    async fn search(&self, filter: &ResourceFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Resource>>;

    async fn set_status(&self, id: Id, status: ResourceStatus, actor: Option<Id>) -> RepositoryResult<Resource>;

    async fn active_assignment(&self, resource_id: Id) -> RepositoryResult<Option<ResourceAssignment>>;

    async fn find_assignment(&self, assignment_id: Id) -> RepositoryResult<Option<ResourceAssignment>>;

    /// Fails with a conflict when the resource already has an active assignment
    async fn create_assignment(
        &self,
        dto: NewResourceAssignment,
        actor: Option<Id>,
    ) -> RepositoryResult<ResourceAssignment>;

    async fn release_assignment(&self, assignment_id: Id, actor: Option<Id>) -> RepositoryResult<ResourceAssignment>;

    /// Releases every active assignment of the work order
    async fn release_for_work_order(
        &self,
        work_order_id: Id,
        actor: Option<Id>,
    ) -> RepositoryResult<Vec<ResourceAssignment>>;

    /// Newest first, released ones included
    async fn assignments_for_work_order(&self, work_order_id: Id) -> RepositoryResult<Vec<ResourceAssignment>>;

    async fn status_counts(&self) -> RepositoryResult<Vec<(ResourceStatus, i64)>>;

    async fn count_in_category(&self, category_id: Id) -> RepositoryResult<i64>;
}

const COLUMNS: &str = "id, code, name, category_id, serial_number, location, purchase_date, status, notes, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

const ASSIGNMENT_COLUMNS: &str =
    "id, resource_id, work_order_id, notes, assigned_at, assigned_by_id, released_at, released_by_id";

pub struct PgResourceStore {
    pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ResourceFilter) {
        builder.push(" WHERE deleted_at IS NULL");
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category_id) = filter.category_id {
            builder.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = like_pattern(q);
            builder
                .push(" AND (code ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR serial_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn mark_resource(
        tx: &mut Transaction<'_, Postgres>,
        resource_id: Id,
        status: ResourceStatus,
        actor: Option<Id>,
    ) -> RepositoryResult<()> {
        sqlx::query("UPDATE resources SET status = $1, updated_by_id = $2, updated_at = NOW() WHERE id = $3")
            .bind(status.as_str())
            .bind(actor)
            .bind(resource_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<Resource, NewResource, UpdateResource> for PgResourceStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Resource>> {
        let sql = format!("SELECT {COLUMNS} FROM resources WHERE id = $1 AND deleted_at IS NULL");
        let resource = sqlx::query_as::<_, Resource>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(resource)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Resource>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM resources WHERE deleted_at IS NULL ORDER BY code LIMIT $1 OFFSET $2"
        );
        let resources = sqlx::query_as::<_, Resource>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(resources)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewResource, actor: Option<Id>) -> RepositoryResult<Resource> {
        let sql = format!(
            r#"
            INSERT INTO resources (
                code, name, category_id, serial_number, location, purchase_date, status, notes,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, 'available', $7, $8, $8)
            RETURNING {COLUMNS}
            "#
        );
        let resource = sqlx::query_as::<_, Resource>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(dto.category_id)
            .bind(&dto.serial_number)
            .bind(&dto.location)
            .bind(dto.purchase_date)
            .bind(&dto.notes)
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(resource)
    }

    async fn update(&self, id: Id, dto: UpdateResource, actor: Option<Id>) -> RepositoryResult<Resource> {
        let sql = format!(
            r#"
            UPDATE resources SET
                code = COALESCE($1, code),
                name = COALESCE($2, name),
                category_id = CASE WHEN $10 THEN $3 ELSE category_id END,
                serial_number = CASE WHEN $11 THEN $4 ELSE serial_number END,
                location = CASE WHEN $12 THEN $5 ELSE location END,
                purchase_date = CASE WHEN $13 THEN $6 ELSE purchase_date END,
                notes = CASE WHEN $14 THEN $7 ELSE notes END,
                updated_by_id = $8,
                updated_at = NOW()
            WHERE id = $9 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Resource>(&sql)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(dto.category_id.flatten())
            .bind(dto.serial_number.clone().flatten())
            .bind(dto.location.clone().flatten())
            .bind(dto.purchase_date.flatten())
            .bind(dto.notes.clone().flatten())
            .bind(actor)
            .bind(id)
            .bind(dto.category_id.is_some())
            .bind(dto.serial_number.is_some())
            .bind(dto.location.is_some())
            .bind(dto.purchase_date.is_some())
            .bind(dto.notes.is_some())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Resource", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE resources SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Resource", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Resource> {
        let sql = format!(
            "UPDATE resources SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Resource", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let unique = sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM resources WHERE code = $1 \
             AND deleted_at IS NULL AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(unique)
    }

    async fn search(&self, filter: &ResourceFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Resource>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM resources"));
        Self::push_conditions(&mut query, filter);
        query
            .push(" ORDER BY code LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        let items = query
            .build_query_as::<Resource>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM resources");
        Self::push_conditions(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn set_status(&self, id: Id, status: ResourceStatus, actor: Option<Id>) -> RepositoryResult<Resource> {
        let sql = format!(
            "UPDATE resources SET status = $1, updated_by_id = $2, updated_at = NOW() \
             WHERE id = $3 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&sql)
            .bind(status.as_str())
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Resource", id))
    }

    async fn active_assignment(&self, resource_id: Id) -> RepositoryResult<Option<ResourceAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM resource_assignments \
             WHERE resource_id = $1 AND released_at IS NULL"
        );
        let assignment = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(assignment)
    }

    async fn find_assignment(&self, assignment_id: Id) -> RepositoryResult<Option<ResourceAssignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM resource_assignments WHERE id = $1");
        let assignment = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(assignment)
    }

    async fn create_assignment(
        &self,
        dto: NewResourceAssignment,
        actor: Option<Id>,
    ) -> RepositoryResult<ResourceAssignment> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO resource_assignments (resource_id, work_order_id, notes, assigned_by_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );
        let assignment = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(dto.resource_id)
            .bind(dto.work_order_id)
            .bind(&dto.notes)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match RepositoryError::from(e) {
                err if err.is_unique_violation() => {
                    RepositoryError::Conflict(format!("Resource {} is already assigned", dto.resource_id))
                }
                err => err,
            })?;

        Self::mark_resource(&mut tx, dto.resource_id, ResourceStatus::InUse, actor).await?;
        tx.commit().await?;
        Ok(assignment)
    }

    async fn release_assignment(&self, assignment_id: Id, actor: Option<Id>) -> RepositoryResult<ResourceAssignment> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE resource_assignments SET released_at = NOW(), released_by_id = $1 \
             WHERE id = $2 AND released_at IS NULL RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(actor)
            .bind(assignment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::not_found("ResourceAssignment", assignment_id))?;

        Self::mark_resource(&mut tx, assignment.resource_id, ResourceStatus::Available, actor).await?;
        tx.commit().await?;
        Ok(assignment)
    }

    async fn release_for_work_order(
        &self,
        work_order_id: Id,
        actor: Option<Id>,
    ) -> RepositoryResult<Vec<ResourceAssignment>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE resource_assignments SET released_at = NOW(), released_by_id = $1 \
             WHERE work_order_id = $2 AND released_at IS NULL RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let released = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(actor)
            .bind(work_order_id)
            .fetch_all(&mut *tx)
            .await?;

        for assignment in &released {
            Self::mark_resource(&mut tx, assignment.resource_id, ResourceStatus::Available, actor).await?;
        }
        tx.commit().await?;
        Ok(released)
    }

    async fn assignments_for_work_order(&self, work_order_id: Id) -> RepositoryResult<Vec<ResourceAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM resource_assignments WHERE work_order_id = $1 \
             ORDER BY assigned_at DESC, id DESC"
        );
        let assignments = sqlx::query_as::<_, ResourceAssignment>(&sql)
            .bind(work_order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(assignments)
    }

    async fn status_counts(&self) -> RepositoryResult<Vec<(ResourceStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM resources WHERE deleted_at IS NULL GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| match status.parse::<ResourceStatus>() {
                Ok(status) => Some((status, count)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unknown resource status");
                    None
                }
            })
            .collect())
    }

    async fn count_in_category(&self, category_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM resources WHERE category_id = $1 AND deleted_at IS NULL",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

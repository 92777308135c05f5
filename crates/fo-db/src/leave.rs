//! Leave request store
//!
//! Statuses are lookup ids, so callers pass the ids that matter for a
//! given check.

use async_trait::async_trait;
use chrono::NaiveDate;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_core::types::DateRange;
use fo_models::{LeaveFilter, LeaveRequest};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::repository::{Repository, RepositoryError, RepositoryResult};

/// Insert data for a request; days and status are decided by the caller
#[derive(Debug, Clone)]
pub struct NewLeaveRecord {
    pub employee_id: Id,
    pub leave_type_id: Id,
    pub status_id: Id,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: Option<String>,
}

/// Moves a request to another status. With a reviewer the review
/// timestamp is set as well.
#[derive(Debug, Clone)]
pub struct LeaveStatusChange {
    /// The change is refused with a conflict unless the request still has
    /// this status when it is written
    pub from_status_id: Option<Id>,
    pub status_id: Id,
    pub reviewed_by_id: Option<Id>,
    pub review_comment: Option<String>,
}

#[async_trait]
pub trait LeaveStore: Repository<LeaveRequest, NewLeaveRecord, LeaveStatusChange> {
    /// Newest start date first
    async fn search(&self, filter: &LeaveFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<LeaveRequest>>;

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Vec<LeaveRequest>>;

    /// Another request of the employee in one of `status_ids` shares a day with `range`
    async fn has_overlap(
        &self,
        employee_id: Id,
        range: &DateRange,
        status_ids: &[Id],
        exclude_id: Option<Id>,
    ) -> RepositoryResult<bool>;

    /// Decides a request that is still in `pending_id`
    async fn review(
        &self,
        id: Id,
        pending_id: Id,
        status_id: Id,
        reviewer_id: Id,
        comment: Option<String>,
    ) -> RepositoryResult<LeaveRequest> {
        let change = LeaveStatusChange {
            from_status_id: Some(pending_id),
            status_id,
            reviewed_by_id: Some(reviewer_id),
            review_comment: comment,
        };
        self.update(id, change, Some(reviewer_id)).await
    }

    /// Requests using the lookup as type or status
    async fn count_by_lookup(&self, lookup_id: Id) -> RepositoryResult<i64>;
}

const COLUMNS: &str = "id, employee_id, leave_type_id, status_id, start_date, end_date, days, reason, \
                       reviewed_by_id, reviewed_at, review_comment, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgLeaveStore {
    pool: PgPool,
}

impl PgLeaveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &LeaveFilter) {
        builder.push(" WHERE deleted_at IS NULL");
        if let Some(employee_id) = filter.employee_id {
            builder.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(status_id) = filter.status_id {
            builder.push(" AND status_id = ").push_bind(status_id);
        }
    }
}

#[async_trait]
impl Repository<LeaveRequest, NewLeaveRecord, LeaveStatusChange> for PgLeaveStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {COLUMNS} FROM leave_requests WHERE id = $1 AND deleted_at IS NULL");
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM leave_requests WHERE deleted_at IS NULL \
             ORDER BY start_date DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewLeaveRecord, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        let sql = format!(
            r#"
            INSERT INTO leave_requests (
                employee_id, leave_type_id, status_id, start_date, end_date, days, reason,
                created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "#
        );
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(dto.employee_id)
            .bind(dto.leave_type_id)
            .bind(dto.status_id)
            .bind(dto.start_date)
            .bind(dto.end_date)
            .bind(dto.days)
            .bind(&dto.reason)
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(request)
    }

    async fn update(&self, id: Id, dto: LeaveStatusChange, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        let sql = format!(
            r#"
            UPDATE leave_requests SET
                status_id = $1,
                reviewed_by_id = COALESCE($2, reviewed_by_id),
                reviewed_at = CASE WHEN $2::BIGINT IS NULL THEN reviewed_at ELSE NOW() END,
                review_comment = COALESCE($3, review_comment),
                updated_by_id = $4,
                updated_at = NOW()
            WHERE id = $5 AND deleted_at IS NULL
              AND ($6::BIGINT IS NULL OR status_id = $6)
            RETURNING {COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(dto.status_id)
            .bind(dto.reviewed_by_id)
            .bind(&dto.review_comment)
            .bind(actor)
            .bind(id)
            .bind(dto.from_status_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(request) => Ok(request),
            None if self.exists(id).await? => Err(RepositoryError::Conflict(format!(
                "Leave request {} is no longer pending",
                id
            ))),
            None => Err(RepositoryError::not_found("LeaveRequest", id)),
        }
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE leave_requests SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("LeaveRequest", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        let sql = format!(
            "UPDATE leave_requests SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("LeaveRequest", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM leave_requests WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl LeaveStore for PgLeaveStore {
    async fn search(&self, filter: &LeaveFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<LeaveRequest>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM leave_requests"));
        Self::push_conditions(&mut query, filter);
        query
            .push(" ORDER BY start_date DESC, id DESC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        let items = query
            .build_query_as::<LeaveRequest>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leave_requests");
        Self::push_conditions(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM leave_requests WHERE employee_id = $1 AND deleted_at IS NULL \
             ORDER BY start_date DESC"
        );
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }

    async fn has_overlap(
        &self,
        employee_id: Id,
        range: &DateRange,
        status_ids: &[Id],
        exclude_id: Option<Id>,
    ) -> RepositoryResult<bool> {
        let overlap = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM leave_requests
                WHERE employee_id = $1
                  AND deleted_at IS NULL
                  AND status_id = ANY($2)
                  AND start_date <= $4
                  AND end_date >= $3
                  AND ($5::BIGINT IS NULL OR id <> $5)
            )
            "#,
        )
        .bind(employee_id)
        .bind(status_ids)
        .bind(range.start)
        .bind(range.end)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(overlap)
    }

    async fn count_by_lookup(&self, lookup_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM leave_requests WHERE (leave_type_id = $1 OR status_id = $1) \
             AND deleted_at IS NULL",
        )
        .bind(lookup_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

//! Work order store
//!
//! Numbers are drawn from `work_order_sequences`, one counter per year.
//! Every write bumps `lock_version`; `update` only applies when the caller
//! saw the current version.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use fo_core::pagination::{PaginatedResult, Pagination, SortParam};
use fo_core::traits::Id;
use fo_models::{NewWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderFilter, WorkOrderStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::repository::{like_pattern, order_by, Repository, RepositoryError, RepositoryResult};

/// Sortable API fields and their columns
pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("number", "number"),
    ("title", "title"),
    ("status", "status"),
    ("priority", "priority"),
    ("dueDate", "due_date"),
    ("startDate", "start_date"),
    ("completionPercentage", "completion_percentage"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

/// Statuses that still count as open work
pub const ACTIVE_STATUSES: &[WorkOrderStatus] = &[
    WorkOrderStatus::Draft,
    WorkOrderStatus::Open,
    WorkOrderStatus::InProgress,
    WorkOrderStatus::OnHold,
];

/// A status transition as persisted
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: WorkOrderStatus,
    /// Stored as given, `None` clears it
    pub completed_at: Option<DateTime<Utc>>,
    /// `None` keeps the current value
    pub completion_percentage: Option<i32>,
}

#[async_trait]
pub trait WorkOrderStore: Repository<WorkOrder, NewWorkOrder, UpdateWorkOrder> {
    async fn search(
        &self,
        filter: &WorkOrderFilter,
        sorts: &[SortParam],
        today: NaiveDate,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<WorkOrder>>;

    async fn set_status(&self, id: Id, change: StatusChange, actor: Option<Id>) -> RepositoryResult<WorkOrder>;

    async fn set_progress(&self, id: Id, percentage: i32, actor: Option<Id>) -> RepositoryResult<WorkOrder>;

    async fn set_assignee(&self, id: Id, employee_id: Option<Id>, actor: Option<Id>) -> RepositoryResult<WorkOrder>;

    async fn status_counts(&self) -> RepositoryResult<Vec<(WorkOrderStatus, i64)>>;

    async fn count_overdue(&self, today: NaiveDate) -> RepositoryResult<i64>;

    /// Mean completion percentage over open, in progress and on hold orders
    async fn average_active_completion(&self) -> RepositoryResult<Option<f64>>;

    /// Orders for the client that are not completed or cancelled
    async fn count_active_for_client(&self, client_id: Id) -> RepositoryResult<i64>;
}

const COLUMNS: &str = "id, number, title, description, client_id, location, status, priority, \
                       completion_percentage, start_date, due_date, completed_at, assigned_employee_id, \
                       lock_version, created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgWorkOrderStore {
    pool: PgPool,
}

impl PgWorkOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_conditions<'a>(
        builder: &mut QueryBuilder<'a, Postgres>,
        filter: &'a WorkOrderFilter,
        today: NaiveDate,
    ) {
        builder.push(" WHERE deleted_at IS NULL");
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(client_id) = filter.client_id {
            builder.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(employee_id) = filter.assigned_employee_id {
            builder.push(" AND assigned_employee_id = ").push_bind(employee_id);
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority.as_str());
        }
        if filter.overdue == Some(true) {
            builder
                .push(" AND due_date < ")
                .push_bind(today)
                .push(" AND status NOT IN ('completed', 'cancelled')");
        }
        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = like_pattern(q);
            builder
                .push(" AND (number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn next_number(tx: &mut sqlx::Transaction<'_, Postgres>, year: i32) -> RepositoryResult<String> {
        let sequence = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO work_order_sequences (year, last_value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = work_order_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;
        Ok(WorkOrder::format_number(year, sequence))
    }
}

#[async_trait]
impl Repository<WorkOrder, NewWorkOrder, UpdateWorkOrder> for PgWorkOrderStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<WorkOrder>> {
        let sql = format!("SELECT {COLUMNS} FROM work_orders WHERE id = $1 AND deleted_at IS NULL");
        let work_order = sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(work_order)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<WorkOrder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM work_orders WHERE deleted_at IS NULL ORDER BY id DESC LIMIT $1 OFFSET $2"
        );
        let work_orders = sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(work_orders)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM work_orders WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewWorkOrder, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let mut tx = self.pool.begin().await?;
        let number = Self::next_number(&mut tx, Utc::now().year()).await?;

        let sql = format!(
            r#"
            INSERT INTO work_orders (
                number, title, description, client_id, location, status, priority,
                start_date, due_date, assigned_employee_id, created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {COLUMNS}
            "#
        );
        let work_order = sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(&number)
            .bind(&dto.title)
            .bind(&dto.description)
            .bind(dto.client_id)
            .bind(&dto.location)
            .bind(dto.status.unwrap_or_default().as_str())
            .bind(dto.priority.unwrap_or_default().as_str())
            .bind(dto.start_date)
            .bind(dto.due_date)
            .bind(dto.assigned_employee_id)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(id = work_order.id, number = %work_order.number, "Work order inserted");
        Ok(work_order)
    }

    async fn update(&self, id: Id, dto: UpdateWorkOrder, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let sql = format!(
            r#"
            UPDATE work_orders SET
                title = COALESCE($1, title),
                description = CASE WHEN $11 THEN $2 ELSE description END,
                client_id = COALESCE($3, client_id),
                location = CASE WHEN $12 THEN $4 ELSE location END,
                priority = COALESCE($5, priority),
                start_date = CASE WHEN $13 THEN $6 ELSE start_date END,
                due_date = CASE WHEN $14 THEN $7 ELSE due_date END,
                lock_version = lock_version + 1,
                updated_by_id = $8,
                updated_at = NOW()
            WHERE id = $9 AND lock_version = $10 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(&dto.title)
            .bind(dto.description.clone().flatten())
            .bind(dto.client_id)
            .bind(dto.location.clone().flatten())
            .bind(dto.priority.map(|p| p.as_str()))
            .bind(dto.start_date.flatten())
            .bind(dto.due_date.flatten())
            .bind(actor)
            .bind(id)
            .bind(dto.lock_version)
            .bind(dto.description.is_some())
            .bind(dto.location.is_some())
            .bind(dto.start_date.is_some())
            .bind(dto.due_date.is_some())
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(work_order) => Ok(work_order),
            None if self.exists(id).await? => Err(RepositoryError::Conflict(format!(
                "Work order {} was changed by someone else",
                id
            ))),
            None => Err(RepositoryError::not_found("WorkOrder", id)),
        }
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE work_orders SET deleted_at = NOW(), lock_version = lock_version + 1, \
             updated_by_id = $1, updated_at = NOW() WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("WorkOrder", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let sql = format!(
            "UPDATE work_orders SET deleted_at = NULL, lock_version = lock_version + 1, \
             updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("WorkOrder", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM work_orders WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl WorkOrderStore for PgWorkOrderStore {
    async fn search(
        &self,
        filter: &WorkOrderFilter,
        sorts: &[SortParam],
        today: NaiveDate,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<WorkOrder>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM work_orders"));
        Self::push_conditions(&mut query, filter, today);
        query
            .push(" ORDER BY ")
            .push(order_by(sorts, SORT_COLUMNS, "id DESC"))
            .push(" LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        let items = query
            .build_query_as::<WorkOrder>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM work_orders");
        Self::push_conditions(&mut count, filter, today);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn set_status(&self, id: Id, change: StatusChange, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let sql = format!(
            r#"
            UPDATE work_orders SET
                status = $1,
                completed_at = $2,
                completion_percentage = COALESCE($3, completion_percentage),
                lock_version = lock_version + 1,
                updated_by_id = $4,
                updated_at = NOW()
            WHERE id = $5 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(change.status.as_str())
            .bind(change.completed_at)
            .bind(change.completion_percentage)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("WorkOrder", id))
    }

    async fn set_progress(&self, id: Id, percentage: i32, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let sql = format!(
            "UPDATE work_orders SET completion_percentage = $1, lock_version = lock_version + 1, \
             updated_by_id = $2, updated_at = NOW() WHERE id = $3 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(percentage)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("WorkOrder", id))
    }

    async fn set_assignee(&self, id: Id, employee_id: Option<Id>, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let sql = format!(
            "UPDATE work_orders SET assigned_employee_id = $1, lock_version = lock_version + 1, \
             updated_by_id = $2, updated_at = NOW() WHERE id = $3 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkOrder>(&sql)
            .bind(employee_id)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("WorkOrder", id))
    }

    async fn status_counts(&self) -> RepositoryResult<Vec<(WorkOrderStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM work_orders WHERE deleted_at IS NULL GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| match status.parse::<WorkOrderStatus>() {
                Ok(status) => Some((status, count)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unknown work order status");
                    None
                }
            })
            .collect())
    }

    async fn count_overdue(&self, today: NaiveDate) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM work_orders WHERE deleted_at IS NULL AND due_date < $1 \
             AND status NOT IN ('completed', 'cancelled')",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn average_active_completion(&self) -> RepositoryResult<Option<f64>> {
        let average = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(completion_percentage)::DOUBLE PRECISION FROM work_orders \
             WHERE deleted_at IS NULL AND status IN ('open', 'in_progress', 'on_hold')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(average)
    }

    async fn count_active_for_client(&self, client_id: Id) -> RepositoryResult<i64> {
        let statuses: Vec<&str> = ACTIVE_STATUSES.iter().map(|s| s.as_str()).collect();
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM work_orders WHERE client_id = $1 AND deleted_at IS NULL \
             AND status = ANY($2)",
        )
        .bind(client_id)
        .bind(&statuses)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

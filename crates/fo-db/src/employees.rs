//! Employee store

use async_trait::async_trait;
use chrono::NaiveDate;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::{Employee, EmployeeFilter, EmploymentStatus, NewEmployee, UpdateEmployee};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::repository::{like_pattern, Repository, RepositoryError, RepositoryResult};

#[async_trait]
pub trait EmployeeStore: Repository<Employee, NewEmployee, UpdateEmployee> {
    async fn is_number_unique(&self, number: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    /// Case-insensitive
    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool>;

    async fn search(&self, filter: &EmployeeFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Employee>>;

    async fn terminate(&self, id: Id, termination_date: NaiveDate, actor: Option<Id>) -> RepositoryResult<Employee>;

    async fn set_status(&self, id: Id, status: EmploymentStatus, actor: Option<Id>) -> RepositoryResult<Employee>;

    async fn count_by_status(&self, status: EmploymentStatus) -> RepositoryResult<i64>;

    async fn count_in_department(&self, department_id: Id) -> RepositoryResult<i64>;
}

const COLUMNS: &str = "id, employee_number, first_name, last_name, email, phone, job_title, \
                       department_id, manager_id, hire_date, termination_date, status, \
                       created_at, updated_at, created_by_id, updated_by_id, deleted_at";

pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &EmployeeFilter) {
        builder.push(" WHERE deleted_at IS NULL");
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(department_id) = filter.department_id {
            builder.push(" AND department_id = ").push_bind(department_id);
        }
        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = like_pattern(q);
            builder
                .push(" AND (employee_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn is_unique(&self, condition: &str, value: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        let sql = format!(
            "SELECT NOT EXISTS(SELECT 1 FROM employees WHERE {condition} AND deleted_at IS NULL \
             AND ($2::BIGINT IS NULL OR id <> $2))"
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
impl Repository<Employee, NewEmployee, UpdateEmployee> for PgEmployeeStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Employee>> {
        let sql = format!("SELECT {COLUMNS} FROM employees WHERE id = $1 AND deleted_at IS NULL");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Employee>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM employees WHERE deleted_at IS NULL \
             ORDER BY last_name, first_name LIMIT $1 OFFSET $2"
        );
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewEmployee, actor: Option<Id>) -> RepositoryResult<Employee> {
        let sql = format!(
            r#"
            INSERT INTO employees (
                employee_number, first_name, last_name, email, phone, job_title,
                department_id, manager_id, hire_date, status, created_by_id, updated_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', $10, $10)
            RETURNING {COLUMNS}
            "#
        );
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(&dto.employee_number)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(&dto.email)
            .bind(&dto.phone)
            .bind(&dto.job_title)
            .bind(dto.department_id)
            .bind(dto.manager_id)
            .bind(dto.hire_date)
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn update(&self, id: Id, dto: UpdateEmployee, actor: Option<Id>) -> RepositoryResult<Employee> {
        let sql = format!(
            r#"
            UPDATE employees SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                email = COALESCE($3, email),
                phone = CASE WHEN $11 THEN $4 ELSE phone END,
                job_title = CASE WHEN $12 THEN $5 ELSE job_title END,
                department_id = CASE WHEN $13 THEN $6 ELSE department_id END,
                manager_id = CASE WHEN $14 THEN $7 ELSE manager_id END,
                hire_date = COALESCE($8, hire_date),
                updated_by_id = $9,
                updated_at = NOW()
            WHERE id = $10 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(&dto.email)
            .bind(dto.phone.clone().flatten())
            .bind(dto.job_title.clone().flatten())
            .bind(dto.department_id.flatten())
            .bind(dto.manager_id.flatten())
            .bind(dto.hire_date)
            .bind(actor)
            .bind(id)
            .bind(dto.phone.is_some())
            .bind(dto.job_title.is_some())
            .bind(dto.department_id.is_some())
            .bind(dto.manager_id.is_some())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Employee", id))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE employees SET deleted_at = NOW(), updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Employee", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Employee> {
        let sql = format!(
            "UPDATE employees SET deleted_at = NULL, updated_by_id = $1, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Employee", id))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl EmployeeStore for PgEmployeeStore {
    async fn is_number_unique(&self, number: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        self.is_unique("employee_number = $1", number, exclude_id).await
    }

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        self.is_unique("LOWER(email) = LOWER($1)", email, exclude_id).await
    }

    async fn search(&self, filter: &EmployeeFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Employee>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM employees"));
        Self::push_conditions(&mut query, filter);
        query
            .push(" ORDER BY last_name, first_name, id LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        let items = query
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employees");
        Self::push_conditions(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn terminate(&self, id: Id, termination_date: NaiveDate, actor: Option<Id>) -> RepositoryResult<Employee> {
        let sql = format!(
            "UPDATE employees SET status = 'terminated', termination_date = $1, updated_by_id = $2, \
             updated_at = NOW() WHERE id = $3 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(termination_date)
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Employee", id))
    }

    async fn set_status(&self, id: Id, status: EmploymentStatus, actor: Option<Id>) -> RepositoryResult<Employee> {
        let sql = format!(
            "UPDATE employees SET status = $1, updated_by_id = $2, updated_at = NOW() \
             WHERE id = $3 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(status.as_str())
            .bind(actor)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Employee", id))
    }

    async fn count_by_status(&self, status: EmploymentStatus) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM employees WHERE status = $1 AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_in_department(&self, department_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM employees WHERE department_id = $1 AND deleted_at IS NULL",
        )
        .bind(department_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

//! PostgreSQL activity log store

use async_trait::async_trait;
use fo_activity::{ActivityError, ActivityResult, ActivityStore};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_models::{ActivityFilter, ActivityLog, NewActivityLog};
use sqlx::{PgPool, Postgres, QueryBuilder};

const COLUMNS: &str = "id, user_id, action, entity_type, entity_id, description, changes, level, \
                       ip_address, user_agent, created_at";

fn store_error(err: sqlx::Error) -> ActivityError {
    ActivityError::Database(err.to_string())
}

pub struct PgActivityStore {
    pool: PgPool,
}

impl PgActivityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_conditions<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a ActivityFilter) {
        builder.push(" WHERE TRUE");
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(entity_type) = filter.entity_type.as_deref() {
            builder.push(" AND entity_type = ").push_bind(entity_type);
        }
        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(level) = filter.level {
            builder.push(" AND level = ").push_bind(level.as_str());
        }
        if let Some(from) = filter.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND created_at <= ").push_bind(to);
        }
    }
}

#[async_trait]
impl ActivityStore for PgActivityStore {
    async fn insert(&self, entry: NewActivityLog) -> ActivityResult<ActivityLog> {
        let sql = format!(
            r#"
            INSERT INTO activity_logs (
                user_id, action, entity_type, entity_id, description, changes, level, ip_address, user_agent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.description)
            .bind(&entry.changes)
            .bind(entry.level.as_str())
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn search(&self, filter: &ActivityFilter, pagination: Pagination) -> ActivityResult<PaginatedResult<ActivityLog>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM activity_logs"));
        Self::push_conditions(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        let items = query
            .build_query_as::<ActivityLog>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs");
        Self::push_conditions(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(PaginatedResult::new(items, total, pagination))
    }
}

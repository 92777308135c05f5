//! Activity logger
//!
//! Recording never fails the caller: store errors are logged and swallowed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::{Entity, Id};
use fo_models::{ActivityFilter, ActivityLevel, ActivityLog, NewActivityLog};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error};
use validator::Validate;

use crate::changes::ChangeSet;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Database error: {0}")]
    Database(String),
}

pub type ActivityResult<T> = Result<T, ActivityError>;

impl From<ActivityError> for FoError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::Database(message) => FoError::Database(message),
        }
    }
}

/// Append-only persistence for activity entries
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert(&self, entry: NewActivityLog) -> ActivityResult<ActivityLog>;

    /// Newest first
    async fn search(&self, filter: &ActivityFilter, pagination: Pagination) -> ActivityResult<PaginatedResult<ActivityLog>>;
}

pub struct MemoryActivityStore {
    entries: RwLock<Vec<ActivityLog>>,
    next_id: AtomicI64,
}

impl Default for MemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn insert(&self, entry: NewActivityLog) -> ActivityResult<ActivityLog> {
        let log = ActivityLog {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: entry.user_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            description: entry.description,
            changes: entry.changes,
            level: entry.level,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        };
        self.entries.write().await.push(log.clone());
        Ok(log)
    }

    async fn search(&self, filter: &ActivityFilter, pagination: Pagination) -> ActivityResult<PaginatedResult<ActivityLog>> {
        let entries = self.entries.read().await;
        let matching: Vec<ActivityLog> = entries
            .iter()
            .rev()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(matching), total, pagination))
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Error reported by the browser application
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientErrorReport {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[validate(length(max = 2000))]
    pub url: Option<String>,
    #[validate(length(max = 20000))]
    pub stack: Option<String>,
    #[validate(length(max = 200))]
    pub component: Option<String>,
}

#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn ActivityStore>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Store an entry; failures are logged only
    pub async fn record(&self, entry: NewActivityLog) {
        let action = entry.action.clone();
        let entity_type = entry.entity_type.clone();
        match self.store.insert(entry).await {
            Ok(log) => debug!(id = log.id, action = %log.action, entity = %log.entity_type, "Activity recorded"),
            Err(e) => error!(error = %e, action = %action, entity = %entity_type, "Failed to record activity"),
        }
    }

    /// A plain entry about one record
    pub async fn action(
        &self,
        actor: Option<Id>,
        action: &str,
        entity_type: &str,
        entity_id: Option<Id>,
        description: impl Into<String>,
        changes: Option<serde_json::Value>,
    ) {
        self.record(NewActivityLog {
            user_id: actor,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            description: Some(description.into()),
            changes,
            level: ActivityLevel::Info,
            ip_address: None,
            user_agent: None,
        })
        .await;
    }

    pub async fn created<T: Entity>(&self, actor: Option<Id>, entity: &T, description: impl Into<String>) {
        self.action(actor, "created", T::TYPE_NAME, Some(entity.id()), description, None)
            .await;
    }

    /// Records the diff; nothing is written when no field changed
    pub async fn updated<T: Entity + Serialize>(&self, actor: Option<Id>, before: &T, after: &T) {
        self.changed(actor, "updated", before, after).await;
    }

    /// Like `updated`, under a specific action name such as `status_changed`
    pub async fn changed<T: Entity + Serialize>(&self, actor: Option<Id>, action: &str, before: &T, after: &T) {
        let changes = ChangeSet::diff(before, after);
        if changes.is_empty() {
            return;
        }
        let fields: Vec<&str> = changes.fields().collect();
        let description = format!("{} {} {}: {}", T::TYPE_NAME, after.id(), action, fields.join(", "));
        self.action(actor, action, T::TYPE_NAME, Some(after.id()), description, changes.into_value())
            .await;
    }

    pub async fn deleted<T: Entity>(&self, actor: Option<Id>, entity: &T, description: impl Into<String>) {
        self.action(actor, "deleted", T::TYPE_NAME, Some(entity.id()), description, None)
            .await;
    }

    pub async fn client_error(&self, actor: Option<Id>, report: ClientErrorReport, meta: RequestMeta) {
        let changes = serde_json::to_value(&report).ok();
        self.record(NewActivityLog {
            user_id: actor,
            action: "client_error".to_string(),
            entity_type: report.component.clone().unwrap_or_else(|| "Client".to_string()),
            entity_id: None,
            description: Some(report.message),
            changes,
            level: ActivityLevel::Error,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        })
        .await;
    }

    pub async fn search(&self, filter: &ActivityFilter, pagination: Pagination) -> ActivityResult<PaginatedResult<ActivityLog>> {
        self.store.search(filter, pagination).await
    }
}

//! Activity log model
//!
//! Table: activity_logs. Entries are append-only.

use chrono::{DateTime, Utc};
use fo_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

text_enum! {
    pub enum ActivityLevel {
        Info => "info",
        Warning => "warning",
        Error => "error",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Id,
    pub user_id: Option<Id>,
    /// e.g. `created`, `updated`, `status_changed`, `client_error`
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Id>,
    pub description: Option<String>,
    /// `{field: {from, to}}`
    pub changes: Option<serde_json::Value>,
    #[sqlx(try_from = "String")]
    pub level: ActivityLevel,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for ActivityLog {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for ActivityLog {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for ActivityLog {
    const TABLE_NAME: &'static str = "activity_logs";
    const TYPE_NAME: &'static str = "ActivityLog";
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityLog {
    pub user_id: Option<Id>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Id>,
    pub description: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub level: ActivityLevel,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub user_id: Option<Id>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Id>,
    pub level: Option<ActivityLevel>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    pub fn matches(&self, log: &ActivityLog) -> bool {
        self.user_id.map_or(true, |id| log.user_id == Some(id))
            && self
                .entity_type
                .as_ref()
                .map_or(true, |t| &log.entity_type == t)
            && self.entity_id.map_or(true, |id| log.entity_id == Some(id))
            && self.level.map_or(true, |l| log.level == l)
            && self.from.map_or(true, |from| log.created_at >= from)
            && self.to.map_or(true, |to| log.created_at <= to)
    }
}

//! Lookup (reference table) model
//!
//! Table: lookups. One table holds every kind; `(kind, code)` is unique.

use chrono::{DateTime, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

text_enum! {
    pub enum LookupKind {
        LeaveType => "leave_type",
        LeaveStatus => "leave_status",
        Department => "department",
        ResourceCategory => "resource_category",
    }
}

/// Codes of the leave statuses the leave workflow depends on
pub mod leave_status {
    pub const PENDING: &str = "PENDING";
    pub const APPROVED: &str = "APPROVED";
    pub const REJECTED: &str = "REJECTED";
    pub const CANCELLED: &str = "CANCELLED";
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    pub id: Id,
    #[sqlx(try_from = "String")]
    pub kind: LookupKind,
    pub code: String,
    pub name: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(Lookup, "lookups", "Lookup");

#[derive(Debug, Clone, Validate)]
pub struct NewLookup {
    pub kind: LookupKind,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLookup {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

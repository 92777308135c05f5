//! Resource (equipment) and assignment models
//!
//! Tables: resources, resource_assignments

use chrono::{DateTime, NaiveDate, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

text_enum! {
    pub enum ResourceStatus {
        Available => "available",
        InUse => "in_use",
        Maintenance => "maintenance",
        Retired => "retired",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Id,
    pub code: String,
    pub name: String,
    /// Resource category lookup
    pub category_id: Option<Id>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(Resource, "resources", "Resource");

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: Option<Id>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResource {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub category_id: Option<Option<Id>>,
    #[validate(length(max = 100))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub serial_number: Option<Option<String>>,
    #[validate(length(max = 300))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub purchase_date: Option<Option<NaiveDate>>,
    #[validate(length(max = 2000))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub notes: Option<Option<String>>,
}

/// A resource booked on a work order; active while `released_at` is empty
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssignment {
    pub id: Id,
    pub resource_id: Id,
    pub work_order_id: Id,
    pub notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by_id: Option<Id>,
    pub released_at: Option<DateTime<Utc>>,
    pub released_by_id: Option<Id>,
}

impl ResourceAssignment {
    pub fn is_active(&self) -> bool {
        self.released_at.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewResourceAssignment {
    pub resource_id: Id,
    /// Taken from the route
    #[serde(default, skip_deserializing)]
    pub work_order_id: Id,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilter {
    pub status: Option<ResourceStatus>,
    pub category_id: Option<Id>,
    /// Free text over code, name and serial number
    pub q: Option<String>,
}

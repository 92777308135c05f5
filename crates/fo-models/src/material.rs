//! Client material model
//!
//! Table: client_materials. `(client_id, code)` is unique among rows that
//! are not soft deleted.

use chrono::{DateTime, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A material catalog entry scoped to one client
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientMaterial {
    pub id: Id,
    pub client_id: Id,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit of measure, e.g. `kg`, `m`, `pcs`
    pub unit: String,
    pub unit_price: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(ClientMaterial, "client_materials", "ClientMaterial");

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClientMaterial {
    /// Taken from the route
    #[serde(default, skip_deserializing)]
    pub client_id: Id,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    #[validate(range(min = 0.0))]
    pub unit_price: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientMaterial {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub description: Option<Option<String>>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub unit_price: Option<Option<f64>>,
    pub is_active: Option<bool>,
}

//! Client and client contact models
//!
//! Tables: clients, client_contacts

use chrono::{DateTime, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A customer that work orders are carried out for
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Id,
    pub code: String,
    pub name: String,
    pub tax_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(Client, "clients", "Client");

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 50))]
    pub tax_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub tax_number: Option<Option<String>>,
    #[validate(email)]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub email: Option<Option<String>>,
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub phone: Option<Option<String>>,
    #[validate(length(max = 500))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// A person to talk to at a client
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub id: Id,
    pub client_id: Id,
    pub full_name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// At most one contact per client is primary
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(ClientContact, "client_contacts", "ClientContact");

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClientContact {
    /// Taken from the route
    #[serde(default, skip_deserializing)]
    pub client_id: Id,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientContact {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub position: Option<Option<String>>,
    #[validate(email)]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub email: Option<Option<String>>,
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub phone: Option<Option<String>>,
    pub is_primary: Option<bool>,
}

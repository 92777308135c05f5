//! Employee model
//!
//! Table: employees

use chrono::{DateTime, NaiveDate, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

text_enum! {
    pub enum EmploymentStatus {
        Active => "active",
        OnLeave => "on_leave",
        Terminated => "terminated",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Id,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    /// Department lookup
    pub department_id: Option<Id>,
    pub manager_id: Option<Id>,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: EmploymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(Employee, "employees", "Employee");

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_terminated(&self) -> bool {
        self.status == EmploymentStatus::Terminated
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 32))]
    pub employee_number: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub job_title: Option<String>,
    pub department_id: Option<Id>,
    pub manager_id: Option<Id>,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub phone: Option<Option<String>>,
    #[validate(length(max = 100))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub job_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub department_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub manager_id: Option<Option<Id>>,
    pub hire_date: Option<NaiveDate>,
}

/// Input for ending employment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateEmployee {
    pub termination_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    pub status: Option<EmploymentStatus>,
    pub department_id: Option<Id>,
    /// Free text over number, names and email
    pub q: Option<String>,
}

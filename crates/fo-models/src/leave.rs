//! Leave request model
//!
//! Table: leave_requests. Type and status reference the `leave_type` and
//! `leave_status` lookups.

use chrono::{DateTime, NaiveDate, Utc};
use fo_core::traits::Id;
use fo_core::types::DateRange;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Id,
    pub employee_id: Id,
    pub leave_type_id: Id,
    pub status_id: Id,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Business days covered
    pub days: i32,
    pub reason: Option<String>,
    pub reviewed_by_id: Option<Id>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(LeaveRequest, "leave_requests", "LeaveRequest");

impl LeaveRequest {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLeaveRequest {
    pub employee_id: Id,
    pub leave_type_id: Id,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveFilter {
    pub employee_id: Option<Id>,
    pub status_id: Option<Id>,
}

/// Reviewer input for approving or rejecting a request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeaveReview {
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

//! Work order model
//!
//! Table: work_orders. Numbers look like `WO-2024-00017` and are assigned by
//! the store on insert.

use chrono::{DateTime, NaiveDate, Utc};
use fo_core::traits::{Id, Lockable};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

text_enum! {
    /// Lifecycle of a work order
    pub enum WorkOrderStatus {
        Draft => "draft",
        Open => "open",
        InProgress => "in_progress",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl WorkOrderStatus {
    /// Statuses reachable from this one
    pub fn allowed_transitions(&self) -> &'static [WorkOrderStatus] {
        use WorkOrderStatus::*;
        match self {
            Draft => &[Open, Cancelled],
            Open => &[InProgress, OnHold, Cancelled],
            InProgress => &[OnHold, Completed, Cancelled],
            OnHold => &[InProgress, Cancelled],
            Completed => &[InProgress],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: WorkOrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// No further transitions possible
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Completed or cancelled
    pub fn is_closed(&self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }

    /// Work is (or can be) carried out in this status
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Open | WorkOrderStatus::InProgress | WorkOrderStatus::OnHold
        )
    }
}

impl Default for WorkOrderStatus {
    fn default() -> Self {
        WorkOrderStatus::Draft
    }
}

text_enum! {
    pub enum WorkOrderPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for WorkOrderPriority {
    fn default() -> Self {
        WorkOrderPriority::Normal
    }
}

/// A unit of contracted field or maintenance work
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: Id,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Id,
    pub location: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: WorkOrderStatus,
    #[sqlx(try_from = "String")]
    pub priority: WorkOrderPriority,
    pub completion_percentage: i32,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assigned_employee_id: Option<Id>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(WorkOrder, "work_orders", "WorkOrder");

impl Lockable for WorkOrder {
    fn lock_version(&self) -> i32 {
        self.lock_version
    }
}

impl WorkOrder {
    /// Past its due date and still not closed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.status.is_closed(),
            None => false,
        }
    }

    pub fn format_number(year: i32, sequence: i64) -> String {
        format!("WO-{}-{:05}", year, sequence)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub client_id: Id,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    pub priority: Option<WorkOrderPriority>,
    /// Draft (default) or open
    pub status: Option<WorkOrderStatus>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_employee_id: Option<Id>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrder {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 10000))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub description: Option<Option<String>>,
    pub client_id: Option<Id>,
    #[validate(length(max = 300))]
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub location: Option<Option<String>>,
    pub priority: Option<WorkOrderPriority>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    /// Must match the stored version
    pub lock_version: i32,
}

/// Search filter for work order listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub client_id: Option<Id>,
    pub assigned_employee_id: Option<Id>,
    pub priority: Option<WorkOrderPriority>,
    /// Only orders past their due date that are not closed
    pub overdue: Option<bool>,
    /// Free text over number, title and location
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkOrderStatus::*;

    #[test]
    fn test_transitions() {
        assert!(Draft.can_transition_to(Open));
        assert!(!Draft.can_transition_to(Completed));
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!OnHold.can_transition_to(Completed));
        assert!(Completed.can_transition_to(InProgress));
        assert!(Cancelled.is_terminal());
        assert!(!Completed.is_terminal());
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in WorkOrderStatus::ALL {
            assert_eq!(status.as_str().parse::<WorkOrderStatus>().unwrap(), *status);
        }
        assert!("done".parse::<WorkOrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_number_format() {
        assert_eq!(WorkOrder::format_number(2024, 17), "WO-2024-00017");
    }

    #[test]
    fn test_filter_from_query_values() {
        let filter: WorkOrderFilter =
            serde_json::from_str(r#"{"status":"on_hold","clientId":4,"overdue":true}"#).unwrap();
        assert_eq!(filter.status, Some(OnHold));
        assert_eq!(filter.client_id, Some(4));
        assert_eq!(filter.overdue, Some(true));
    }
}

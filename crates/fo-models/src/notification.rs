//! In-app notification model
//!
//! Table: notifications

use chrono::{DateTime, Utc};
use fo_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::Serialize;
use sqlx::FromRow;

text_enum! {
    pub enum NotificationKind {
        WorkOrderAssigned => "work_order_assigned",
        WorkOrderStatusChanged => "work_order_status_changed",
        LeaveReviewed => "leave_reviewed",
        System => "system",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    /// User the notification is for
    pub recipient_id: Id,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Relative link into the app
    pub link: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl Identifiable for Notification {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Notification {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.read_at.unwrap_or(self.created_at)
    }
}

impl Entity for Notification {
    const TABLE_NAME: &'static str = "notifications";
    const TYPE_NAME: &'static str = "Notification";
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: Id,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

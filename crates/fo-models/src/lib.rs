//! # fo-models
//!
//! Domain models for FieldOps.
//!
//! Each persisted entity carries the base fields (id, timestamps, audit ids and
//! the soft-delete mark) and implements the core traits from `fo-core`. Input
//! types (`New*`, `Update*`) live next to the entity they create or change.

pub use fo_core::traits::{Auditable, Entity, Id, Identifiable, SoftDeletable, Timestamped};

#[macro_use]
mod macros;

pub mod activity;
pub mod attachment;
pub mod client;
pub mod employee;
pub mod error;
pub mod leave;
pub mod lookup;
pub mod material;
pub mod notification;
pub mod patch;
pub mod resource;
pub mod role;
pub mod template;
pub mod user;
pub mod work_order;

pub use activity::{ActivityFilter, ActivityLevel, ActivityLog, NewActivityLog};
pub use attachment::{Attachment, AttachmentContainer, NewAttachment};
pub use client::{Client, ClientContact, NewClient, NewClientContact, UpdateClient, UpdateClientContact};
pub use employee::{
    Employee, EmployeeFilter, EmploymentStatus, NewEmployee, TerminateEmployee, UpdateEmployee,
};
pub use error::ParseEnumError;
pub use leave::{LeaveFilter, LeaveRequest, LeaveReview, NewLeaveRequest};
pub use lookup::{leave_status, Lookup, LookupKind, NewLookup, UpdateLookup};
pub use material::{ClientMaterial, NewClientMaterial, UpdateClientMaterial};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use resource::{
    NewResource, NewResourceAssignment, Resource, ResourceAssignment, ResourceFilter, ResourceStatus,
    UpdateResource,
};
pub use role::{NewPermission, NewRole, Permission, Role, UpdateRole};
pub use template::{DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate};
pub use user::{ChangePassword, NewUser, UpdateUser, User};
pub use work_order::{
    NewWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderFilter, WorkOrderPriority, WorkOrderStatus,
};

/// Codes are compared and stored trimmed and upper-cased
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  cem-42 "), "CEM-42");
        assert_eq!(normalize_code("ABC"), "ABC");
    }
}

//! Delete contract for work orders

use fo_core::error::ValidationErrors;
use fo_models::{WorkOrder, WorkOrderStatus};

use super::permissions;
use crate::base::{Contract, UserContext, ValidationResult};

/// Only draft or cancelled orders may be deleted, except by administrators
pub struct DeleteWorkOrderContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> DeleteWorkOrderContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<WorkOrder> for DeleteWorkOrderContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::DELETE)
    }

    fn validate(&self, work_order: &WorkOrder) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        let deletable = matches!(
            work_order.status,
            WorkOrderStatus::Draft | WorkOrderStatus::Cancelled
        );
        if !deletable && !self.user.is_admin() {
            errors.add_base(format!(
                "Work order {} is {} and can only be deleted by an administrator",
                work_order.number, work_order.status
            ));
        }
        errors.into_result()
    }
}

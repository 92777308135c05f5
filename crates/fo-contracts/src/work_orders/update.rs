//! Update contract for work orders

use fo_core::error::ValidationErrors;
use fo_models::{UpdateWorkOrder, WorkOrder};

use super::base::WorkOrderBaseContract;
use super::permissions;
use crate::base::{validate_fields, Contract, UserContext, ValidationResult};

/// Validates a patch against the stored order
pub struct UpdateWorkOrderContract<'a> {
    base: WorkOrderBaseContract<'a>,
    current: &'a WorkOrder,
}

impl<'a> UpdateWorkOrderContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a WorkOrder) -> Self {
        Self {
            base: WorkOrderBaseContract::new(user),
            current,
        }
    }
}

impl<'a> Contract<UpdateWorkOrder> for UpdateWorkOrderContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.base.user()
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::EDIT)
    }

    fn validate(&self, patch: &UpdateWorkOrder) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if self.current.status.is_closed() {
            errors.add_base(format!(
                "A {} work order cannot be edited",
                self.current.status
            ));
            return Err(errors);
        }

        if let Some(title) = &patch.title {
            self.base.validate_title(title, &mut errors);
        }
        if let Some(client_id) = patch.client_id {
            self.base.validate_client(client_id, &mut errors);
        }
        // Dates are compared after the patch is applied
        let start = patch.start_date.unwrap_or(self.current.start_date);
        let due = patch.due_date.unwrap_or(self.current.due_date);
        self.base.validate_dates(start, due, &mut errors);

        if !errors.has_error("title") {
            validate_fields(patch, &mut errors);
        }

        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        !matches!(
            attribute,
            "number" | "status" | "completionPercentage" | "completedAt"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_work_order, MockUser};
    use chrono::NaiveDate;
    use fo_models::WorkOrderStatus;

    #[test]
    fn test_closed_orders_are_read_only() {
        let user = MockUser::admin();
        for status in [WorkOrderStatus::Completed, WorkOrderStatus::Cancelled] {
            let mut current = sample_work_order();
            current.status = status;
            let contract = UpdateWorkOrderContract::new(&user, &current);
            let patch = UpdateWorkOrder {
                title: Some("New title".into()),
                ..Default::default()
            };
            let errors = contract.validate(&patch).unwrap_err();
            assert_eq!(errors.base_errors.len(), 1);
        }
    }

    #[test]
    fn test_due_date_checked_against_stored_start() {
        let user = MockUser::with(&[permissions::EDIT]);
        let mut current = sample_work_order();
        current.start_date = NaiveDate::from_ymd_opt(2024, 6, 10);
        let contract = UpdateWorkOrderContract::new(&user, &current);

        let patch = UpdateWorkOrder {
            due_date: Some(NaiveDate::from_ymd_opt(2024, 6, 1)),
            ..Default::default()
        };
        assert!(contract.check(&patch).is_err());

        let patch = UpdateWorkOrder {
            due_date: Some(NaiveDate::from_ymd_opt(2024, 6, 30)),
            ..Default::default()
        };
        assert!(contract.check(&patch).is_ok());
    }

    #[test]
    fn test_status_is_not_writable() {
        let user = MockUser::admin();
        let current = sample_work_order();
        let contract = UpdateWorkOrderContract::new(&user, &current);
        assert!(!contract.is_writable("status"));
        assert!(contract.is_writable("title"));
    }
}

//! Completion percentage contract

use fo_core::error::ValidationErrors;
use fo_models::WorkOrder;

use super::base::WorkOrderBaseContract;
use super::permissions;
use crate::base::{Contract, UserContext, ValidationResult};

pub struct ProgressContract<'a> {
    base: WorkOrderBaseContract<'a>,
    current: &'a WorkOrder,
}

impl<'a> ProgressContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a WorkOrder) -> Self {
        Self {
            base: WorkOrderBaseContract::new(user),
            current,
        }
    }
}

impl<'a> Contract<i32> for ProgressContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.base.user()
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::EDIT)
    }

    fn validate(&self, percentage: &i32) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        self.base.validate_percentage(*percentage, &mut errors);
        if !self.current.status.is_active() {
            errors.add_base(format!(
                "Progress cannot be reported on a {} work order",
                self.current.status
            ));
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_work_order, MockUser};
    use fo_models::WorkOrderStatus;

    #[test]
    fn test_progress_on_active_order() {
        let user = MockUser::with(&[permissions::EDIT]);
        let current = sample_work_order();
        let contract = ProgressContract::new(&user, &current);
        assert!(contract.check(&60).is_ok());
        assert!(contract.check(&-1).is_err());
        assert!(contract.check(&150).is_err());
    }

    #[test]
    fn test_progress_rejected_on_draft() {
        let user = MockUser::admin();
        let mut current = sample_work_order();
        current.status = WorkOrderStatus::Draft;
        let errors = ProgressContract::new(&user, &current)
            .validate(&10)
            .unwrap_err();
        assert!(!errors.base_errors.is_empty());
    }
}

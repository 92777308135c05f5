//! Status transition contract

use fo_core::error::ValidationErrors;
use fo_models::{WorkOrder, WorkOrderStatus};

use super::permissions;
use crate::base::{Contract, UserContext, ValidationResult};

/// Enforces the work order transition table
pub struct ChangeStatusContract<'a> {
    user: &'a dyn UserContext,
    current: &'a WorkOrder,
}

impl<'a> ChangeStatusContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a WorkOrder) -> Self {
        Self { user, current }
    }
}

impl<'a> Contract<WorkOrderStatus> for ChangeStatusContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE_STATUS)
    }

    fn validate(&self, target: &WorkOrderStatus) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        let from = self.current.status;

        if from == *target {
            errors.add("status", format!("is already {}", from));
        } else if !from.can_transition_to(*target) {
            let allowed: Vec<&str> = from.allowed_transitions().iter().map(|s| s.as_str()).collect();
            if allowed.is_empty() {
                errors.add("status", format!("cannot change a {} work order", from));
            } else {
                errors.add(
                    "status",
                    format!(
                        "cannot change from {} to {} (allowed: {})",
                        from,
                        target,
                        allowed.join(", ")
                    ),
                );
            }
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_work_order, MockUser};
    use WorkOrderStatus::*;

    fn check(from: WorkOrderStatus, to: WorkOrderStatus) -> bool {
        let user = MockUser::with(&[permissions::MANAGE_STATUS]);
        let mut current = sample_work_order();
        current.status = from;
        ChangeStatusContract::new(&user, &current).check(&to).is_ok()
    }

    #[test]
    fn test_transition_table() {
        assert!(check(Draft, Open));
        assert!(check(Open, InProgress));
        assert!(check(InProgress, Completed));
        assert!(check(Completed, InProgress));
        assert!(!check(Draft, Completed));
        assert!(!check(OnHold, Completed));
        assert!(!check(Cancelled, Open));
        assert!(!check(Open, Open));
    }

    #[test]
    fn test_requires_manage_status() {
        let user = MockUser::with(&[permissions::EDIT]);
        let current = sample_work_order();
        let err = ChangeStatusContract::new(&user, &current)
            .check(&InProgress)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}

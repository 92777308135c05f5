//! Create contract for work orders

use fo_core::error::ValidationErrors;
use fo_models::{NewWorkOrder, WorkOrderStatus};

use super::base::WorkOrderBaseContract;
use super::permissions;
use crate::base::{validate_fields, Contract, UserContext, ValidationResult};

pub struct CreateWorkOrderContract<'a> {
    base: WorkOrderBaseContract<'a>,
}

impl<'a> CreateWorkOrderContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self {
            base: WorkOrderBaseContract::new(user),
        }
    }

    /// New orders start as draft or open
    fn validate_initial_status(&self, status: Option<WorkOrderStatus>, errors: &mut ValidationErrors) {
        if let Some(status) = status {
            if !matches!(status, WorkOrderStatus::Draft | WorkOrderStatus::Open) {
                errors.add("status", "must be draft or open for a new work order");
            }
        }
    }
}

impl<'a> Contract<NewWorkOrder> for CreateWorkOrderContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.base.user()
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::CREATE)
    }

    fn validate(&self, input: &NewWorkOrder) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        self.base.validate_title(&input.title, &mut errors);
        self.base.validate_client(input.client_id, &mut errors);
        self.base
            .validate_dates(input.start_date, input.due_date, &mut errors);
        self.validate_initial_status(input.status, &mut errors);
        if !errors.has_error("title") {
            validate_fields(input, &mut errors);
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;
    use chrono::NaiveDate;

    fn input() -> NewWorkOrder {
        NewWorkOrder {
            title: "Replace boiler valve".into(),
            client_id: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_input() {
        let user = MockUser::with(&[permissions::CREATE]);
        assert!(CreateWorkOrderContract::new(&user).check(&input()).is_ok());
    }

    #[test]
    fn test_requires_permission() {
        let user = MockUser::with(&[permissions::VIEW]);
        let err = CreateWorkOrderContract::new(&user).check(&input()).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_rejects_bad_input() {
        let user = MockUser::admin();
        let contract = CreateWorkOrderContract::new(&user);
        let mut wo = input();
        wo.title = String::new();
        wo.client_id = 0;
        wo.status = Some(WorkOrderStatus::Completed);
        wo.start_date = NaiveDate::from_ymd_opt(2024, 3, 2);
        wo.due_date = NaiveDate::from_ymd_opt(2024, 3, 1);

        let errors = contract.validate(&wo).unwrap_err();
        assert!(errors.has_error("title"));
        assert!(errors.has_error("clientId"));
        assert!(errors.has_error("status"));
        assert!(errors.has_error("dueDate"));
    }
}

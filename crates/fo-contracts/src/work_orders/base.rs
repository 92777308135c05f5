//! Validations shared by the work order contracts

use chrono::NaiveDate;
use fo_core::error::ValidationErrors;
use fo_core::traits::Id;
use fo_core::types::Percentage;

use crate::base::UserContext;

/// Common work order rules
pub struct WorkOrderBaseContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> WorkOrderBaseContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &'a dyn UserContext {
        self.user
    }

    /// Title is present and within length
    pub fn validate_title(&self, title: &str, errors: &mut ValidationErrors) {
        let title = title.trim();
        if title.is_empty() {
            errors.add("title", "can't be blank");
        } else if title.chars().count() > 200 {
            errors.add("title", "is too long (maximum is 200 characters)");
        }
    }

    pub fn validate_client(&self, client_id: Id, errors: &mut ValidationErrors) {
        if client_id <= 0 {
            errors.add("clientId", "can't be blank");
        }
    }

    /// Due date must not precede the start date
    pub fn validate_dates(
        &self,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
        errors: &mut ValidationErrors,
    ) {
        if let (Some(start), Some(due)) = (start, due) {
            if due < start {
                errors.add("dueDate", "must be on or after the start date");
            }
        }
    }

    pub fn validate_percentage(&self, percentage: i32, errors: &mut ValidationErrors) {
        if Percentage::new(percentage).is_err() {
            errors.add("completionPercentage", "must be between 0 and 100");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;

    #[test]
    fn test_dates() {
        let user = MockUser::admin();
        let base = WorkOrderBaseContract::new(&user);
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();

        let mut errors = ValidationErrors::new();
        base.validate_dates(Some(d(10)), Some(d(9)), &mut errors);
        assert!(errors.has_error("dueDate"));

        let mut errors = ValidationErrors::new();
        base.validate_dates(Some(d(10)), Some(d(10)), &mut errors);
        base.validate_dates(None, Some(d(1)), &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_title_and_percentage() {
        let user = MockUser::admin();
        let base = WorkOrderBaseContract::new(&user);
        let mut errors = ValidationErrors::new();
        base.validate_title("   ", &mut errors);
        base.validate_percentage(101, &mut errors);
        base.validate_client(0, &mut errors);
        assert!(errors.has_error("title"));
        assert!(errors.has_error("completionPercentage"));
        assert!(errors.has_error("clientId"));
    }
}

//! Leave request contracts
//!
//! Overlap with other requests needs the store and is checked by the service.

use fo_core::error::ValidationErrors;
use fo_core::types::DateRange;
use fo_models::{LeaveRequest, LeaveReview, NewLeaveRequest};

use crate::base::{is_allowed, validate_fields, Contract, UserContext, ValidationResult};

pub mod permissions {
    pub const REQUEST: &str = "leave.request";
    pub const REVIEW: &str = "leave.review";
}

pub struct SubmitLeaveContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> SubmitLeaveContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }

    /// Employees file their own requests; reviewers may file for anyone
    fn validate_requester(&self, input: &NewLeaveRequest, errors: &mut ValidationErrors) {
        let own = self.user.employee_id() == Some(input.employee_id);
        if !own && !is_allowed(self.user, permissions::REVIEW) {
            errors.add("employeeId", "must be your own employee record");
        }
    }
}

impl<'a> Contract<NewLeaveRequest> for SubmitLeaveContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::REQUEST)
    }

    fn validate(&self, input: &NewLeaveRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        self.validate_requester(input, &mut errors);
        if input.leave_type_id <= 0 {
            errors.add("leaveTypeId", "can't be blank");
        }
        match DateRange::new(input.start_date, input.end_date) {
            Ok(range) if range.business_days() < 1 => {
                errors.add("endDate", "must cover at least one business day");
            }
            Ok(_) => {}
            Err(_) => errors.add("endDate", "must be on or after the start date"),
        }
        validate_fields(input, &mut errors);
        errors.into_result()
    }
}

/// Approve or reject; the caller tells whether the request is still pending
pub struct ReviewLeaveContract<'a> {
    user: &'a dyn UserContext,
    request: &'a LeaveRequest,
    pending: bool,
}

impl<'a> ReviewLeaveContract<'a> {
    pub fn new(user: &'a dyn UserContext, request: &'a LeaveRequest, pending: bool) -> Self {
        Self {
            user,
            request,
            pending,
        }
    }
}

impl<'a> Contract<LeaveReview> for ReviewLeaveContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::REVIEW)
    }

    fn validate(&self, review: &LeaveReview) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if !self.pending {
            errors.add_base("Only pending leave requests can be reviewed");
        }
        if self.user.employee_id() == Some(self.request.employee_id) {
            errors.add_base("You cannot review your own leave request");
        }
        validate_fields(review, &mut errors);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;
    use chrono::{NaiveDate, Utc};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn request_input(employee_id: i64, start: NaiveDate, end: NaiveDate) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id,
            leave_type_id: 1,
            start_date: start,
            end_date: end,
            reason: None,
        }
    }

    fn employee_user(employee_id: i64) -> MockUser {
        let mut user = MockUser::with(&[permissions::REQUEST]);
        user.employee_id = Some(employee_id);
        user
    }

    #[test]
    fn test_submit_own_request() {
        let user = employee_user(5);
        let contract = SubmitLeaveContract::new(&user);
        // Mon 2024-06-03 .. Wed 2024-06-05
        assert!(contract.check(&request_input(5, date(6, 3), date(6, 5))).is_ok());

        let errors = contract
            .validate(&request_input(6, date(6, 3), date(6, 5)))
            .unwrap_err();
        assert!(errors.has_error("employeeId"));
    }

    #[test]
    fn test_reviewer_may_submit_for_others() {
        let user = MockUser::with(&[permissions::REQUEST, permissions::REVIEW]);
        let contract = SubmitLeaveContract::new(&user);
        assert!(contract.check(&request_input(6, date(6, 3), date(6, 3))).is_ok());
    }

    #[test]
    fn test_dates() {
        let user = employee_user(5);
        let contract = SubmitLeaveContract::new(&user);

        let inverted = contract
            .validate(&request_input(5, date(6, 5), date(6, 3)))
            .unwrap_err();
        assert!(inverted.has_error("endDate"));

        // Sat 2024-06-08 .. Sun 2024-06-09
        let weekend = contract
            .validate(&request_input(5, date(6, 8), date(6, 9)))
            .unwrap_err();
        assert!(weekend.has_error("endDate"));
    }

    fn stored_request(employee_id: i64) -> LeaveRequest {
        let now = Utc::now();
        LeaveRequest {
            id: 1,
            employee_id,
            leave_type_id: 1,
            status_id: 1,
            start_date: date(6, 3),
            end_date: date(6, 5),
            days: 3,
            reason: None,
            reviewed_by_id: None,
            reviewed_at: None,
            review_comment: None,
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_review_rules() {
        let mut reviewer = MockUser::with(&[permissions::REVIEW]);
        reviewer.employee_id = Some(9);
        let request = stored_request(5);
        let review = LeaveReview::default();

        assert!(ReviewLeaveContract::new(&reviewer, &request, true)
            .check(&review)
            .is_ok());
        assert!(ReviewLeaveContract::new(&reviewer, &request, false)
            .check(&review)
            .is_err());

        let own = stored_request(9);
        assert!(ReviewLeaveContract::new(&reviewer, &own, true)
            .check(&review)
            .is_err());

        let requester = employee_user(5);
        let err = ReviewLeaveContract::new(&requester, &request, true)
            .check(&review)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}

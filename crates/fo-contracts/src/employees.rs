//! Employee contracts

use chrono::NaiveDate;
use fo_core::error::ValidationErrors;
use fo_models::{Employee, NewEmployee, TerminateEmployee, UpdateEmployee};

use crate::base::{validate_fields, validate_presence, Contract, UserContext, ValidationResult};

pub mod permissions {
    pub const VIEW: &str = "employees.view";
    pub const MANAGE: &str = "employees.manage";
}

pub struct CreateEmployeeContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateEmployeeContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewEmployee> for CreateEmployeeContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewEmployee) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_presence("employeeNumber", &input.employee_number, &mut errors);
        validate_presence("firstName", &input.first_name, &mut errors);
        validate_presence("lastName", &input.last_name, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateEmployeeContract<'a> {
    user: &'a dyn UserContext,
    current: &'a Employee,
}

impl<'a> UpdateEmployeeContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a Employee) -> Self {
        Self { user, current }
    }
}

impl<'a> Contract<UpdateEmployee> for UpdateEmployeeContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateEmployee) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(first_name) = &patch.first_name {
            validate_presence("firstName", first_name, &mut errors);
        }
        if let Some(last_name) = &patch.last_name {
            validate_presence("lastName", last_name, &mut errors);
        }
        if patch.manager_id == Some(Some(self.current.id)) {
            errors.add("managerId", "cannot be the employee themselves");
        }
        if let (Some(hire), Some(termination)) = (patch.hire_date, self.current.termination_date) {
            validate_termination_after_hire(hire, termination, &mut errors);
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

pub struct TerminateEmployeeContract<'a> {
    user: &'a dyn UserContext,
    current: &'a Employee,
}

impl<'a> TerminateEmployeeContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a Employee) -> Self {
        Self { user, current }
    }
}

impl<'a> Contract<TerminateEmployee> for TerminateEmployeeContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &TerminateEmployee) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if self.current.is_terminated() {
            errors.add_base(format!(
                "Employee {} is already terminated",
                self.current.employee_number
            ));
        }
        validate_termination_after_hire(self.current.hire_date, input.termination_date, &mut errors);
        errors.into_result()
    }
}

fn validate_termination_after_hire(hire: NaiveDate, termination: NaiveDate, errors: &mut ValidationErrors) {
    if termination < hire {
        errors.add("terminationDate", "must be on or after the hire date");
    }
}

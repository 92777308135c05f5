//! Create contract for users

use fo_core::error::ValidationErrors;
use fo_models::NewUser;

use super::base::{validate_password, validate_username};
use super::permissions;
use crate::base::{validate_fields, validate_presence, Contract, UserContext, ValidationResult};

pub struct CreateUserContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateUserContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewUser> for CreateUserContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewUser) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_username(&input.username, &mut errors);
        validate_presence("firstName", &input.first_name, &mut errors);
        validate_presence("lastName", &input.last_name, &mut errors);
        validate_password("password", &input.password, &mut errors);
        if !errors.has_error("username") {
            let mut field_errors = ValidationErrors::new();
            validate_fields(input, &mut field_errors);
            for (field, messages) in field_errors.errors {
                if !errors.has_error(&field) {
                    for message in messages {
                        errors.add(field.clone(), message);
                    }
                }
            }
        }
        errors.into_result()
    }
}

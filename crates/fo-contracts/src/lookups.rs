//! Lookup contracts

use fo_core::error::ValidationErrors;
use fo_models::{NewLookup, UpdateLookup};

use crate::base::{
    validate_code, validate_fields, validate_presence, Contract, UserContext, ValidationResult,
};

pub mod permissions {
    pub const MANAGE: &str = "lookups.manage";
}

/// Covers both creating and editing lookup values
pub struct LookupContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> LookupContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewLookup> for LookupContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewLookup) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_code("code", &input.code, &mut errors);
        validate_presence("name", &input.name, &mut errors);
        if input.sort_order < 0 {
            errors.add("sortOrder", "must be greater than or equal to 0");
        }
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

impl<'a> Contract<UpdateLookup> for LookupContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateLookup) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
        }
        if matches!(patch.sort_order, Some(order) if order < 0) {
            errors.add("sortOrder", "must be greater than or equal to 0");
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

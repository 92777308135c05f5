//! Client material contracts
//!
//! Uniqueness of `(client_id, code)` needs the store and is checked by the
//! service after the contract passes.

use fo_core::error::ValidationErrors;
use fo_models::{NewClientMaterial, UpdateClientMaterial};

use crate::base::{
    validate_code, validate_fields, validate_presence, Contract, UserContext, ValidationResult,
};

pub mod permissions {
    pub const VIEW: &str = "materials.view";
    pub const MANAGE: &str = "materials.manage";
}

fn validate_unit_price(price: Option<f64>, errors: &mut ValidationErrors) {
    if let Some(price) = price {
        if !price.is_finite() || price < 0.0 {
            errors.add("unitPrice", "must be greater than or equal to 0");
        }
    }
}

pub struct CreateMaterialContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateMaterialContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewClientMaterial> for CreateMaterialContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewClientMaterial) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if input.client_id <= 0 {
            errors.add("clientId", "can't be blank");
        }
        validate_code("code", &input.code, &mut errors);
        validate_presence("name", &input.name, &mut errors);
        validate_presence("unit", &input.unit, &mut errors);
        validate_unit_price(input.unit_price, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateMaterialContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> UpdateMaterialContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<UpdateClientMaterial> for UpdateMaterialContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateClientMaterial) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(code) = &patch.code {
            validate_code("code", code, &mut errors);
        }
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
        }
        if let Some(unit) = &patch.unit {
            validate_presence("unit", unit, &mut errors);
        }
        validate_unit_price(patch.unit_price.flatten(), &mut errors);
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

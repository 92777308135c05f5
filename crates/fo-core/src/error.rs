//! Core error types for FieldOps
//!
//! Every layer converts its own error enum into [`FoError`], which the HTTP
//! layer maps onto a status code.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Core error type for all FieldOps operations
#[derive(Error, Debug)]
pub enum FoError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractError),

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FoError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        FoError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        FoError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        FoError::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        FoError::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for a validation failure on a single field
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        FoError::Validation(errors)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            FoError::NotFound { .. } => 404,
            FoError::Unauthorized { .. } => 401,
            FoError::Forbidden { .. } => 403,
            FoError::Validation(_) | FoError::Contract(_) => 422,
            FoError::Conflict { .. } => 409,
            FoError::Database(_) | FoError::Internal(_) | FoError::Storage(_) => 500,
            FoError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            FoError::NotFound { .. } => "not_found",
            FoError::Unauthorized { .. } => "unauthorized",
            FoError::Forbidden { .. } => "forbidden",
            FoError::Validation(_) => "validation_failed",
            FoError::Contract(_) => "contract_violated",
            FoError::Conflict { .. } => "conflict",
            FoError::Database(_) => "database_error",
            FoError::Storage(_) => "storage_error",
            FoError::Internal(_) => "internal_error",
            FoError::Config(_) => "configuration_error",
        }
    }
}

/// Validation errors collection, keyed by field name
#[derive(Error, Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(source: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in source.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| describe_validator_code(&error.code));
                errors.add(to_camel_case(field), message);
            }
        }
        errors
    }
}

fn describe_validator_code(code: &str) -> String {
    match code {
        "length" => "has an invalid length".to_string(),
        "email" => "is not a valid email address".to_string(),
        "range" => "is out of range".to_string(),
        "required" => "can't be blank".to_string(),
        other => format!("is invalid ({})", other),
    }
}

/// Field names are reported the way the JSON API spells them
fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Contract validation error
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Attribute {attribute} is invalid: {message}")]
    AttributeInvalid { attribute: String, message: String },

    #[error("Attribute {attribute} is not writable")]
    AttributeNotWritable { attribute: String },

    #[error("Base contract error: {message}")]
    Base { message: String },
}

impl From<ContractError> for ValidationErrors {
    fn from(err: ContractError) -> Self {
        let mut errors = ValidationErrors::new();
        match err {
            ContractError::AttributeInvalid { attribute, message } => {
                errors.add(attribute, message);
            }
            ContractError::AttributeNotWritable { attribute } => {
                errors.add(attribute, "is not writable");
            }
            ContractError::Base { message } => {
                errors.add_base(message);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1))]
        unit_price_label: String,
    }

    #[test]
    fn test_validation_errors_merge_and_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("code", "has already been taken");

        let mut other = ValidationErrors::new();
        other.add("code", "is invalid");
        other.add_base("Client is archived");
        errors.merge(other);

        assert!(errors.has_error("code"));
        assert_eq!(errors.get("code").map(Vec::len), Some(2));
        let messages = errors.full_messages();
        assert_eq!(messages[0], "Client is archived");
        assert!(messages.contains(&"code has already been taken".to_string()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FoError::not_found("Client", 3).status_code(), 404);
        assert_eq!(FoError::unauthorized("x").status_code(), 401);
        assert_eq!(FoError::forbidden("x").status_code(), 403);
        assert_eq!(FoError::conflict("x").status_code(), 409);
        assert_eq!(FoError::invalid("code", "x").status_code(), 422);
        assert_eq!(FoError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_from_validator_errors_uses_camel_case() {
        let sample = Sample {
            unit_price_label: String::new(),
        };
        let errors: ValidationErrors = sample.validate().unwrap_err().into();
        assert!(errors.has_error("unitPriceLabel"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let mut errors = ValidationErrors::new();
        errors.add_base("nope");
        assert!(errors.into_result().is_err());
    }
}

//! Base contract system

use fo_core::error::{FoError, ValidationErrors};
use fo_core::result::FoResult;
use fo_core::traits::Id;
use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Role that passes every permission check
pub const ADMIN_ROLE: &str = "Administrator";

/// Codes: upper case letters, digits, `_` and `-`, 2..=32 long
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9_-]{1,31}$").expect("valid code pattern"));

/// The acting user as contracts see it
pub trait UserContext: Send + Sync {
    fn id(&self) -> Id;
    fn is_admin(&self) -> bool;
    /// Role-string guard
    fn has_role(&self, role: &str) -> bool;
    /// Check a permission code such as `work_orders.edit`
    fn allowed(&self, permission: &str) -> bool;
    /// Employee record linked to the account
    fn employee_id(&self) -> Option<Id> {
        None
    }
}

/// Base contract trait
pub trait Contract<T: ?Sized>: Send + Sync {
    fn user(&self) -> &dyn UserContext;

    /// Permission the acting user needs, checked before validation
    fn permission(&self) -> Option<&'static str> {
        None
    }

    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;

    /// Check if an attribute is writable
    fn is_writable(&self, _attribute: &str) -> bool {
        true
    }

    /// Authorize, then validate
    fn check(&self, entity: &T) -> FoResult<()> {
        if let Some(permission) = self.permission() {
            ensure_allowed(self.user(), permission)?;
        }
        self.validate(entity).map_err(FoError::Validation)
    }
}

/// Administrators pass every check
pub fn is_allowed(user: &dyn UserContext, permission: &str) -> bool {
    user.is_admin() || user.allowed(permission)
}

pub fn ensure_allowed(user: &dyn UserContext, permission: &str) -> FoResult<()> {
    if is_allowed(user, permission) {
        Ok(())
    } else {
        Err(FoError::forbidden(format!(
            "You are not authorized to perform this action ({})",
            permission
        )))
    }
}

/// Run the derive-based field rules and collect them
pub fn validate_fields<V: Validate>(input: &V, errors: &mut ValidationErrors) {
    if let Err(e) = input.validate() {
        errors.merge(e.into());
    }
}

/// Codes are checked after normalisation
pub fn validate_code(field: &str, code: &str, errors: &mut ValidationErrors) {
    let code = fo_models::normalize_code(code);
    if code.is_empty() {
        errors.add(field, "can't be blank");
    } else if !CODE_PATTERN.is_match(&code) {
        errors.add(
            field,
            "may only contain letters, digits, '_' and '-' (2 to 32 characters)",
        );
    }
}

pub fn validate_presence(field: &str, value: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    }
}

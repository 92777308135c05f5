//! Role contracts

use fo_core::error::ValidationErrors;
use fo_models::{NewRole, Role, UpdateRole};

use crate::base::{validate_fields, validate_presence, Contract, UserContext, ValidationResult};

pub mod permissions {
    pub const MANAGE: &str = "roles.manage";
}

/// Every granted code must exist in the permission catalog
fn validate_permission_codes(codes: &[String], known: &[String], errors: &mut ValidationErrors) {
    for code in codes {
        if !known.iter().any(|k| k == code) {
            errors.add("permissions", format!("contains unknown permission '{}'", code));
        }
    }
}

pub struct CreateRoleContract<'a> {
    user: &'a dyn UserContext,
    known: &'a [String],
}

impl<'a> CreateRoleContract<'a> {
    pub fn new(user: &'a dyn UserContext, known: &'a [String]) -> Self {
        Self { user, known }
    }
}

impl<'a> Contract<NewRole> for CreateRoleContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewRole) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_presence("name", &input.name, &mut errors);
        validate_permission_codes(&input.permissions, self.known, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateRoleContract<'a> {
    user: &'a dyn UserContext,
    current: &'a Role,
    known: &'a [String],
}

impl<'a> UpdateRoleContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a Role, known: &'a [String]) -> Self {
        Self {
            user,
            current,
            known,
        }
    }
}

impl<'a> Contract<UpdateRole> for UpdateRoleContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateRole) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
            if self.current.is_system && name != &self.current.name {
                errors.add("name", "of a built-in role cannot be changed");
            }
        }
        if let Some(codes) = &patch.permissions {
            validate_permission_codes(codes, self.known, &mut errors);
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

pub struct DeleteRoleContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> DeleteRoleContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<Role> for DeleteRoleContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, role: &Role) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if role.is_system {
            errors.add_base(format!("Built-in role {} cannot be deleted", role.name));
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;
    use chrono::Utc;

    fn known() -> Vec<String> {
        vec!["clients.view".into(), "clients.manage".into()]
    }

    fn role(is_system: bool) -> Role {
        let now = Utc::now();
        Role {
            id: 1,
            name: "Manager".into(),
            description: None,
            is_system,
            permissions: vec![],
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_unknown_permission_rejected() {
        let admin = MockUser::admin();
        let known = known();
        let input = NewRole {
            name: "Dispatcher".into(),
            description: None,
            permissions: vec!["clients.view".into(), "rockets.launch".into()],
            is_system: false,
        };
        let errors = CreateRoleContract::new(&admin, &known)
            .validate(&input)
            .unwrap_err();
        assert_eq!(errors.get("permissions").map(Vec::len), Some(1));
    }

    #[test]
    fn test_system_role_protection() {
        let admin = MockUser::admin();
        let known = known();
        let system = role(true);

        let rename = UpdateRole {
            name: Some("Boss".into()),
            ..Default::default()
        };
        assert!(UpdateRoleContract::new(&admin, &system, &known)
            .validate(&rename)
            .is_err());

        let regrant = UpdateRole {
            permissions: Some(vec!["clients.manage".into()]),
            ..Default::default()
        };
        assert!(UpdateRoleContract::new(&admin, &system, &known)
            .check(&regrant)
            .is_ok());

        assert!(DeleteRoleContract::new(&admin).check(&system).is_err());
        assert!(DeleteRoleContract::new(&admin).check(&role(false)).is_ok());
    }
}

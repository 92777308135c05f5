//! Update contract for users

use fo_core::error::ValidationErrors;
use fo_models::{UpdateUser, User};

use super::permissions;
use crate::base::{validate_fields, validate_presence, Contract, UserContext, ValidationResult};

pub struct UpdateUserContract<'a> {
    user: &'a dyn UserContext,
    current: &'a User,
}

impl<'a> UpdateUserContract<'a> {
    pub fn new(user: &'a dyn UserContext, current: &'a User) -> Self {
        Self { user, current }
    }
}

impl<'a> Contract<UpdateUser> for UpdateUserContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateUser) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(first_name) = &patch.first_name {
            validate_presence("firstName", first_name, &mut errors);
        }
        if let Some(last_name) = &patch.last_name {
            validate_presence("lastName", last_name, &mut errors);
        }
        if patch.is_active == Some(false) && self.current.id == self.user.id() {
            errors.add("isActive", "you cannot deactivate your own account");
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;
    use chrono::Utc;

    fn stored(id: i64) -> User {
        let now = Utc::now();
        User {
            id,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            password_hash: String::new(),
            is_active: true,
            employee_id: None,
            failed_login_count: 0,
            last_failed_login_at: None,
            last_login_at: None,
            roles: vec![],
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_cannot_deactivate_self() {
        let admin = MockUser::admin();
        let me = stored(admin.id);
        let patch = UpdateUser {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(UpdateUserContract::new(&admin, &me).validate(&patch).is_err());

        let other = stored(99);
        assert!(UpdateUserContract::new(&admin, &other).check(&patch).is_ok());
    }

    #[test]
    fn test_email_format() {
        let admin = MockUser::admin();
        let other = stored(99);
        let patch = UpdateUser {
            email: Some("no-at-sign".into()),
            ..Default::default()
        };
        let errors = UpdateUserContract::new(&admin, &other)
            .validate(&patch)
            .unwrap_err();
        assert!(errors.has_error("email"));
    }
}

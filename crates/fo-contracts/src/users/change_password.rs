//! Own password change

use fo_core::error::ValidationErrors;
use fo_models::ChangePassword;

use super::base::validate_password;
use crate::base::{validate_presence, Contract, UserContext, ValidationResult};

/// Any signed-in user may change their own password
pub struct ChangePasswordContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> ChangePasswordContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<ChangePassword> for ChangePasswordContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn validate(&self, input: &ChangePassword) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_presence("currentPassword", &input.current_password, &mut errors);
        validate_password("newPassword", &input.new_password, &mut errors);
        if input.new_password == input.current_password {
            errors.add("newPassword", "must differ from the current password");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;

    #[test]
    fn test_change_password() {
        let user = MockUser::nobody();
        let contract = ChangePasswordContract::new(&user);

        let ok = ChangePassword {
            current_password: "oldpass1".into(),
            new_password: "newpass22".into(),
        };
        assert!(contract.check(&ok).is_ok());

        let same = ChangePassword {
            current_password: "oldpass1".into(),
            new_password: "oldpass1".into(),
        };
        assert!(contract.validate(&same).unwrap_err().has_error("newPassword"));
    }
}

//! Client and client contact contracts

use fo_core::error::ValidationErrors;
use fo_models::{NewClient, NewClientContact, UpdateClient, UpdateClientContact};

use crate::base::{
    validate_code, validate_fields, validate_presence, Contract, UserContext, ValidationResult,
};

pub mod permissions {
    pub const VIEW: &str = "clients.view";
    pub const MANAGE: &str = "clients.manage";
}

pub struct CreateClientContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateClientContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewClient> for CreateClientContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewClient) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_code("code", &input.code, &mut errors);
        validate_presence("name", &input.name, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateClientContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> UpdateClientContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<UpdateClient> for UpdateClientContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateClient) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(code) = &patch.code {
            validate_code("code", code, &mut errors);
        }
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

/// Covers both creating and editing a contact
pub struct ClientContactContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> ClientContactContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewClientContact> for ClientContactContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewClientContact) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_presence("fullName", &input.full_name, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

impl<'a> Contract<UpdateClientContact> for ClientContactContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateClientContact) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.full_name {
            validate_presence("fullName", name, &mut errors);
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

    fn client(code: &str, email: Option<&str>) -> NewClient {
        NewClient {
            code: code.into(),
            name: "Acme Water".into(),
            tax_number: None,
            email: email.map(String::from),
            phone: None,
            address: None,
            is_active: None,
        }
    }

    #[test]
    fn test_create_client() {
        let user = MockUser::with(&[permissions::MANAGE]);
        let contract = CreateClientContract::new(&user);
        assert!(contract.check(&client("acme", Some("ops@acme.test"))).is_ok());

        let errors = contract
            .validate(&client("acme water", None))
            .unwrap_err();
        assert!(errors.has_error("code"));

        let errors = contract
            .validate(&client("ACME", Some("not-an-email")))
            .unwrap_err();
        assert!(errors.has_error("email"));
    }

    #[test]
    fn test_view_permission_cannot_manage() {
        let user = MockUser::with(&[permissions::VIEW]);
        let err = CreateClientContract::new(&user)
            .check(&client("ACME", None))
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_contact_requires_name() {
        let user = MockUser::admin();
        let contract = ClientContactContract::new(&user);
        let contact = NewClientContact {
            client_id: 1,
            full_name: " ".into(),
            position: None,
            email: None,
            phone: None,
            is_primary: false,
        };
        let errors = Contract::<NewClientContact>::validate(&contract, &contact).unwrap_err();
        assert!(errors.has_error("fullName"));

        let patch = UpdateClientContact {
            email: Some(Some("bad".into())),
            ..Default::default()
        };
        let errors = Contract::<UpdateClientContact>::validate(&contract, &patch).unwrap_err();
        assert!(errors.has_error("email"));
    }
}

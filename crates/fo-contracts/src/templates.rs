//! Document template contracts

use fo_core::error::ValidationErrors;
use fo_models::{NewDocumentTemplate, UpdateDocumentTemplate};

use crate::base::{
    validate_code, validate_fields, validate_presence, Contract, UserContext, ValidationResult,
};

pub mod permissions {
    pub const VIEW: &str = "templates.view";
    pub const MANAGE: &str = "templates.manage";
}

/// Every `{{` needs a matching `}}` before the next `{{`
fn validate_markers(content: &str, errors: &mut ValidationErrors) {
    let mut open = false;
    let mut rest = content;
    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            if open {
                errors.add("content", "has a '{{' inside another placeholder");
                return;
            }
            open = true;
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            if !open {
                errors.add("content", "has a '}}' without a matching '{{'");
                return;
            }
            open = false;
            rest = &tail[2..];
        } else {
            rest = &tail[1..];
        }
    }
    if open {
        errors.add("content", "has an unclosed '{{' placeholder");
    }
}

pub struct CreateTemplateContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateTemplateContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewDocumentTemplate> for CreateTemplateContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewDocumentTemplate) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_code("code", &input.code, &mut errors);
        validate_presence("name", &input.name, &mut errors);
        validate_presence("content", &input.content, &mut errors);
        validate_markers(&input.content, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateTemplateContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> UpdateTemplateContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<UpdateDocumentTemplate> for UpdateTemplateContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateDocumentTemplate) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
        }
        if let Some(content) = &patch.content {
            validate_presence("content", content, &mut errors);
            validate_markers(content, &mut errors);
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

    fn markers(content: &str) -> bool {
        let mut errors = ValidationErrors::new();
        validate_markers(content, &mut errors);
        errors.is_empty()
    }

    #[test]
    fn test_markers() {
        assert!(markers("Dear {{ client_name }}, order {{number}} is done."));
        assert!(markers("No placeholders at all { }"));
        assert!(!markers("Broken {{ name"));
        assert!(!markers("Stray }} here"));
        assert!(!markers("{{ a {{ b }} }}"));
    }

    #[test]
    fn test_create_template() {
        let user = MockUser::with(&[permissions::MANAGE]);
        let input = NewDocumentTemplate {
            code: "wo-report".into(),
            name: "Work order report".into(),
            category: None,
            content: "Order {{ number }}".into(),
            is_active: None,
        };
        assert!(CreateTemplateContract::new(&user).check(&input).is_ok());

        let viewer = MockUser::with(&[permissions::VIEW]);
        assert!(CreateTemplateContract::new(&viewer).check(&input).is_err());
    }
}

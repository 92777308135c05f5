//! Username and password rules

use fo_core::error::ValidationErrors;
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]{3,64}$").expect("valid username pattern"));

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_username(username: &str, errors: &mut ValidationErrors) {
    if username.is_empty() {
        errors.add("username", "can't be blank");
    } else if !USERNAME_PATTERN.is_match(username) {
        errors.add(
            "username",
            "must be 3 to 64 characters of letters, digits, '.', '_' or '-'",
        );
    }
}

/// At least eight characters with one letter and one digit
pub fn validate_password(field: &str, password: &str, errors: &mut ValidationErrors) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!("is too short (minimum is {} characters)", MIN_PASSWORD_LENGTH),
        );
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add(field, "must contain at least one letter and one digit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username() {
        let mut errors = ValidationErrors::new();
        validate_username("j.doe-2", &mut errors);
        assert!(errors.is_empty());

        for bad in ["jd", "john doe", "jöhn"] {
            let mut errors = ValidationErrors::new();
            validate_username(bad, &mut errors);
            assert!(errors.has_error("username"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_password_strength() {
        let mut errors = ValidationErrors::new();
        validate_password("password", "s3cretpass", &mut errors);
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        validate_password("password", "abc1", &mut errors);
        validate_password("password", "onlyletters", &mut errors);
        assert_eq!(errors.get("password").map(Vec::len), Some(2));
    }
}

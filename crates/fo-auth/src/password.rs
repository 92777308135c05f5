//! Password hashing
//!
//! argon2id with the crate's default parameters. Hashes are PHC strings, so
//! the salt and parameters travel with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use argon2::Argon2;
use fo_core::error::FoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashFailed(String),
    #[error("Stored password hash is malformed: {0}")]
    InvalidHash(String),
}

impl From<PasswordError> for FoError {
    fn from(err: PasswordError) -> Self {
        FoError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        use argon2::password_hash::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashFailed(e.to_string()))
    }

    /// `Ok(false)` on a wrong password, `Err` only for an unreadable hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("s3cret-pass").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("s3cret-pass", &hash).unwrap());
        assert!(!hasher.verify("wrong-pass1", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("same-password1").unwrap();
        let b = hasher.hash("same-password1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash() {
        let hasher = PasswordHasher::new();
        assert!(matches!(
            hasher.verify("whatever1", "plain-text"),
            Err(PasswordError::InvalidHash(_))
        ));
    }
}

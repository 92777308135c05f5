//! JWT Authentication
//!
//! HS256 bearer tokens. The claims carry the user's role names and
//! permission codes so a request can be authorized without a lookup.

use chrono::Utc;
use fo_core::error::FoError;
use fo_core::traits::Id;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::CurrentUser;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
    /// Permission codes granted by the roles
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Linked employee record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Id>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Id, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::Invalid("Invalid user ID in token".to_string()))
    }

    pub fn into_current_user(self) -> Result<CurrentUser, JwtError> {
        let id = self.user_id()?;
        let mut user = CurrentUser::new(id, self.username)
            .with_roles(self.roles)
            .with_permissions(self.permissions);
        user.employee_id = self.employee_id;
        Ok(user)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Missing token")]
    Missing,
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

impl From<JwtError> for FoError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(message) => FoError::Internal(message),
            other => FoError::unauthorized(other.to_string()),
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until expiry
    pub expires_in: u64,
}

/// JWT service for creating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: u64,
}

impl JwtService {
    /// Create a new JWT service with the given secret and token lifetime
    pub fn new(secret: &[u8], expires_in_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expires_in: expires_in_seconds,
        }
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// Sign a token for the user with the configured lifetime
    pub fn issue(&self, user: &CurrentUser) -> Result<IssuedToken, JwtError> {
        let token = self.create_token(user, self.expires_in as i64)?;
        Ok(IssuedToken {
            token,
            expires_in: self.expires_in,
        })
    }

    /// Create a new JWT token. A negative lifetime yields an expired token.
    pub fn create_token(&self, user: &CurrentUser, expires_in_seconds: i64) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let exp = (now + expires_in_seconds).max(0);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            roles: user.roles.clone(),
            permissions: user.permission_list(),
            employee_id: user.employee_id,
            exp: exp as usize,
            iat: now as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and rebuild the user it was issued for
    pub fn current_user(&self, token: &str) -> Result<CurrentUser, JwtError> {
        self.validate_token(token)?.into_current_user()
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes";

    fn technician() -> CurrentUser {
        CurrentUser::new(42, "tech")
            .with_roles(["Technician"])
            .with_permissions(["work_orders.view", "leave.request"])
            .with_employee(9)
    }

    #[test]
    fn test_create_and_validate_token() {
        let service = JwtService::new(SECRET, 3600);
        let issued = service.issue(&technician()).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = service.validate_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "tech");
        assert_eq!(claims.roles, vec!["Technician"]);
        assert_eq!(claims.permissions, vec!["leave.request", "work_orders.view"]);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_current_user_round_trip() {
        let service = JwtService::new(SECRET, 3600);
        let token = service.issue(&technician()).unwrap().token;

        let user = service.current_user(&token).unwrap();
        assert_eq!(user, technician());
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(SECRET, 3600);
        let token = service.create_token(&technician(), -120).unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = JwtService::new(SECRET, 3600).issue(&technician()).unwrap().token;
        let other = JwtService::new(b"another-secret-key-of-enough-length", 3600);
        assert!(matches!(other.validate_token(&token), Err(JwtError::Invalid(_))));
        assert!(matches!(other.validate_token("not-a-token"), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(FoError::from(JwtError::Expired).status_code(), 401);
        assert_eq!(FoError::from(JwtError::EncodingFailed("x".into())).status_code(), 500);
    }
}

//! Request authentication
//!
//! Resolves the acting user from `Authorization: Bearer <token>`. Browsers
//! cannot set headers on a WebSocket upgrade, so the token is also accepted
//! as the `access_token` query parameter.

use std::sync::Arc;

use fo_core::error::FoError;
use thiserror::Error;
use tracing::debug;

use crate::jwt::{extract_bearer_token, JwtError, JwtService};
use crate::permissions::CurrentUser;

/// Authentication errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    Required,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Token expired")]
    TokenExpired,
    #[error("Account is locked after too many failed logins")]
    Locked,
    #[error("Account is inactive")]
    Inactive,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for FoError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => FoError::forbidden(err.to_string()),
            AuthError::Internal(message) => FoError::Internal(message),
            other => FoError::unauthorized(other.to_string()),
        }
    }
}

/// Authentication result
#[derive(Debug)]
pub enum AuthResult {
    Authenticated(CurrentUser),
    Failed(AuthError),
}

impl AuthResult {
    pub fn into_result(self) -> Result<CurrentUser, AuthError> {
        match self {
            AuthResult::Authenticated(user) => Ok(user),
            AuthResult::Failed(err) => Err(err),
        }
    }
}

/// Request data relevant for authentication
#[derive(Debug, Default, Clone)]
pub struct RequestHeaders {
    pub authorization: Option<String>,
    /// `access_token` from the query string
    pub access_token: Option<String>,
    pub x_forwarded_for: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestHeaders {
    /// Create from a list of header key-value pairs
    pub fn from_pairs(pairs: &[(impl AsRef<str>, impl AsRef<str>)]) -> Self {
        let mut headers = Self::default();

        for (name, value) in pairs {
            let value = value.as_ref().to_string();
            match name.as_ref().to_ascii_lowercase().as_str() {
                "authorization" => headers.authorization = Some(value),
                "x-forwarded-for" => headers.x_forwarded_for = Some(value),
                "user-agent" => headers.user_agent = Some(value),
                _ => {}
            }
        }

        headers
    }

    /// Pick `access_token` out of a raw query string
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.access_token = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "access_token")
                .map(|(_, value)| value.to_string())
                .filter(|value| !value.is_empty())
        });
        self
    }

    /// First address of `X-Forwarded-For`
    pub fn client_ip(&self) -> Option<String> {
        self.x_forwarded_for
            .as_deref()
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
    }
}

/// Authenticator for validating requests
#[derive(Clone)]
pub struct Authenticator {
    jwt: Arc<JwtService>,
}

impl Authenticator {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// The header wins over the query parameter
    pub async fn authenticate(&self, headers: &RequestHeaders) -> AuthResult {
        let token = match headers.authorization.as_deref() {
            Some(value) => match extract_bearer_token(value) {
                Some(token) => token,
                None => return AuthResult::Failed(AuthError::InvalidCredentials),
            },
            None => match headers.access_token.as_deref() {
                Some(token) => token,
                None => return AuthResult::Failed(AuthError::Required),
            },
        };

        match self.jwt.current_user(token) {
            Ok(user) => AuthResult::Authenticated(user),
            Err(JwtError::Expired) => AuthResult::Failed(AuthError::TokenExpired),
            Err(e) => {
                debug!(error = %e, "Rejected token");
                AuthResult::Failed(AuthError::InvalidCredentials)
            }
        }
    }
}

//! API error handling
//!
//! Every failure is answered with the same JSON body:
//! `{ "_type": "Error", "errorIdentifier": "...", "message": "...", "errors": {...} }`.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fo_core::error::{FoError, ValidationErrors};
use serde::Serialize;
use tracing::error;

const URN_PREFIX: &str = "urn:fieldops:api:v1:errors:";

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound { resource: &'static str, id: String },
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NotFound",
            ApiError::Validation(_) => "PropertyConstraintViolation",
            ApiError::Unauthorized(_) => "Unauthenticated",
            ApiError::Forbidden(_) => "MissingPermission",
            ApiError::BadRequest(_) => "InvalidRequestBody",
            ApiError::Conflict(_) => "UpdateConflict",
            ApiError::PayloadTooLarge(_) => "PayloadTooLarge",
            ApiError::Internal(_) => "InternalError",
        }
    }
}

impl From<FoError> for ApiError {
    fn from(err: FoError) -> Self {
        match err {
            FoError::NotFound { entity, value, .. } => ApiError::NotFound { resource: entity, id: value },
            FoError::Unauthorized { message } => ApiError::Unauthorized(message),
            FoError::Forbidden { message } => ApiError::Forbidden(message),
            FoError::Validation(errors) => ApiError::Validation(errors),
            FoError::Contract(e) => ApiError::Validation(e.into()),
            FoError::Conflict { message } => ApiError::Conflict(message),
            other => {
                error!(error = %other, code = other.error_code(), "Request failed");
                ApiError::Internal("An internal error occurred".into())
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(rename = "_type")]
    type_name: &'static str,
    error_identifier: String,
    message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_identifier = format!("{}{}", URN_PREFIX, self.identifier());
        let (message, errors) = match self {
            ApiError::NotFound { resource, id } => (format!("{} with id {} not found", resource, id), BTreeMap::new()),
            ApiError::Validation(errors) => (errors.full_messages().join(", "), errors.errors),
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Internal(msg) => (msg, BTreeMap::new()),
        };

        let body = ErrorBody {
            type_name: "Error",
            error_identifier,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (FoError::not_found("Client", 4), StatusCode::NOT_FOUND),
            (FoError::invalid("code", "has already been taken"), StatusCode::UNPROCESSABLE_ENTITY),
            (FoError::unauthorized("no"), StatusCode::UNAUTHORIZED),
            (FoError::forbidden("no"), StatusCode::FORBIDDEN),
            (FoError::conflict("busy"), StatusCode::CONFLICT),
            (FoError::Database("gone".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        match ApiError::from(FoError::Database("password=secret".into())) {
            ApiError::Internal(message) => assert!(!message.contains("secret")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

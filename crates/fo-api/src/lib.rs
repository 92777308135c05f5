//! # fo-api
//!
//! REST API v1 handlers for FieldOps.
//!
//! Every route lives under `/api/v1`. Collections are returned as HAL
//! `Collection` documents and errors as `Error` documents carrying an
//! `urn:fieldops:api:v1:errors:*` identifier.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod representers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::AppState;
pub use routes::router;

//! Application state and axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use fo_attachments::Storage;
use fo_auth::{Authenticator, CurrentUser, JwtService, RequestHeaders};
use fo_core::config::AppConfig;
use fo_core::error::FoError;
use fo_core::pagination::{Pagination, PaginationParams};
use fo_db::Stores;
use fo_notifications::NotificationHub;
use fo_services::Services;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub services: Arc<Services>,
    pub auth: Authenticator,
    pub storage: Arc<dyn Storage>,
    pub hub: NotificationHub,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores, storage: Arc<dyn Storage>) -> Self {
        let hub = NotificationHub::default();
        let services = Services::new(&stores, &config, storage.clone(), hub.clone());
        let jwt = Arc::new(JwtService::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_expiration_seconds,
        ));

        Self {
            config: Arc::new(config),
            stores,
            services: Arc::new(services),
            auth: Authenticator::new(jwt),
            storage,
            hub,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Authenticated user extractor
///
/// Accepts `Authorization: Bearer <token>` or an `access_token` query
/// parameter; anything else is answered with 401. The account is re-read
/// on every request, so a deactivated user is refused at once.
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let headers = request_headers(parts);

        let claims = app_state
            .auth
            .authenticate(&headers)
            .await
            .into_result()
            .map_err(|e| ApiError::from(FoError::from(e)))?;
        let user = app_state.services.users.current(&claims).await?;
        Ok(AuthenticatedUser(user))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The headers authentication and audit care about
pub fn request_headers(parts: &Parts) -> RequestHeaders {
    let pairs: Vec<(&str, &str)> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    RequestHeaders::from_pairs(&pairs).with_query(parts.uri.query())
}

/// 403 unless the user holds `permission`
pub fn require_permission(user: &CurrentUser, permission: &str) -> ApiResult<()> {
    if user.allowed(permission) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("Missing permission {}", permission)))
    }
}

/// `?offset=&pageSize=`, clamped; malformed values fall back to the defaults
pub struct Paging(pub Pagination);

#[async_trait]
impl<S> FromRequestParts<S> for Paging
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|_| Query(PaginationParams::default()));
        Ok(Paging(params.pagination()))
    }
}

impl std::ops::Deref for Paging {
    type Target = Pagination;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// JSON body whose rejections use the API error format
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::payload_too_large(rejection.body_text()))
            }
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Query string whose rejections use the API error format
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

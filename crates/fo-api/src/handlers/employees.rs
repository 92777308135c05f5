//! Employee handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{EmployeeFilter, NewEmployee, TerminateEmployee, UpdateEmployee};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

/// GET /api/v1/employees
pub async fn list_employees(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(filter): ApiQuery<EmployeeFilter>,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.employees.list(&user, &filter, *paging).await?;
    Ok(collection(result, "/employees"))
}

/// GET /api/v1/employees/:id
pub async fn get_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.employees.get(&user, id).await?))
}

/// POST /api/v1/employees
pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewEmployee>,
) -> ApiResult<impl IntoResponse> {
    let employee = state.services.employees.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// PATCH /api/v1/employees/:id
pub async fn update_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateEmployee>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.employees.update(&user, id, body).await?))
}

/// POST /api/v1/employees/:id/terminate
pub async fn terminate_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<TerminateEmployee>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.employees.terminate(&user, id, body).await?))
}

/// DELETE /api/v1/employees/:id
pub async fn delete_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.employees.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

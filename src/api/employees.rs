use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::extract::JsonBody;
use super::validation::validate_id;
use super::{ApiError, AppState, CreatedResponse, SetDepartmentRequest};
use crate::db::EmployeeInput;

const ENTITY: &str = "employees";

pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<EmployeeInput>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.store().employee_repo().create(&payload).await?;
    state.notify(ENTITY);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<EmployeeInput>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state.store().employee_repo().update(id, &payload).await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/employees/{id}/set_department
/// A missing or zero `department_id` detaches the employee.
pub async fn set_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<SetDepartmentRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .employee_repo()
        .set_department(id, payload.department_id)
        .await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::extract::JsonBody;
use super::validation::validate_id;
use super::{
    ApiError, AppState, CreatedResponse, ListParams, SetEnabledRequest, SetPasswordRequest,
};
use crate::db::User;
use crate::domain::{ListQuery, Page};
use crate::services::{Subject, UserInput};

const ENTITY: &str = "users";

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<User>>, ApiError> {
    let query = ListQuery::try_from(params)?;
    Ok(Json(state.user_service().list(&query).await?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let id = validate_id(id)?;
    Ok(Json(state.user_service().get(id).await?))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<UserInput>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.user_service().create(payload).await?;
    state.notify(ENTITY);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<UserInput>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state.user_service().update(id, payload).await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    if id == subject.user_id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }
    state.user_service().delete(id).await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/{id}/set_password
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .user_service()
        .set_password(
            &subject,
            id,
            payload.old_password.as_deref(),
            &payload.new_password,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/{id}/reset_password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state.user_service().reset_password(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/{id}/set_enabled
pub async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<SetEnabledRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state.user_service().set_enabled(id, payload.enabled).await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

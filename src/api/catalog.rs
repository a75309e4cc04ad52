//! Reference catalog routes. Reads and the soft-delete lifecycle are generic
//! over [`Catalog`]; creates and updates are per entity.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use super::extract::JsonBody;
use super::validation::validate_id;
use super::{
    ApiError, AppState, ContractRequest, CreatedResponse, ListParams, ProfileRequest, TitleRequest,
};
use crate::db::Catalog;
use crate::domain::{ListQuery, Page};
use crate::entities::{categories, companies, contracts, departments, profiles};

fn table<E: Catalog>() -> String {
    E::default().table_name().to_string()
}

pub async fn read<E>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<E::Model>, ApiError>
where
    E: Catalog,
    E::Model: Serialize,
{
    let id = validate_id(id)?;
    Ok(Json(state.store().get::<E>(id).await?))
}

pub async fn list<E>(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<E::Model>>, ApiError>
where
    E: Catalog,
    E::Model: Serialize + Sync,
{
    let query = ListQuery::try_from(params)?;
    Ok(Json(state.store().list::<E>(&query).await?))
}

pub async fn delete<E>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    E: Catalog,
{
    let id = validate_id(id)?;
    state.store().soft_delete::<E>(id).await?;
    state.notify(&table::<E>());
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore<E>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    E: Catalog,
{
    let id = validate_id(id)?;
    state.store().restore::<E>(id).await?;
    state.notify(&table::<E>());
    Ok(StatusCode::NO_CONTENT)
}

fn created(state: &AppState, entity: &str, id: i64) -> (StatusCode, Json<CreatedResponse>) {
    state.notify(entity);
    (StatusCode::CREATED, Json(CreatedResponse { id }))
}

fn updated(state: &AppState, entity: &str) -> StatusCode {
    state.notify(entity);
    StatusCode::NO_CONTENT
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.store().category_repo().create(&payload.title).await?;
    Ok(created(&state, &table::<categories::Entity>(), id))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .category_repo()
        .update(id, &payload.title)
        .await?;
    Ok(updated(&state, &table::<categories::Entity>()))
}

pub async fn create_company(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.store().company_repo().create(&payload.title).await?;
    Ok(created(&state, &table::<companies::Entity>(), id))
}

pub async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .company_repo()
        .update(id, &payload.title)
        .await?;
    Ok(updated(&state, &table::<companies::Entity>()))
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state
        .store()
        .department_repo()
        .create(&payload.title)
        .await?;
    Ok(created(&state, &table::<departments::Entity>(), id))
}

pub async fn update_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<TitleRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .department_repo()
        .update(id, &payload.title)
        .await?;
    Ok(updated(&state, &table::<departments::Entity>()))
}

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<ProfileRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state
        .store()
        .profile_repo()
        .create(&payload.title, payload.category_id)
        .await?;
    Ok(created(&state, &table::<profiles::Entity>(), id))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<ProfileRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .profile_repo()
        .update(id, &payload.title, payload.category_id)
        .await?;
    Ok(updated(&state, &table::<profiles::Entity>()))
}

pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<ContractRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state
        .store()
        .contract_repo()
        .create(&payload.number, &payload.address)
        .await?;
    Ok(created(&state, &table::<contracts::Entity>(), id))
}

pub async fn update_contract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<ContractRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .contract_repo()
        .update(id, &payload.number, &payload.address)
        .await?;
    Ok(updated(&state, &table::<contracts::Entity>()))
}

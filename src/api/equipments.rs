use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::extract::JsonBody;
use super::validation::validate_id;
use super::{ApiError, AppState, CreatedResponse, UpdateEquipmentRequest};
use crate::db::{EquipmentView, MovementView};
use crate::domain::events::NotificationEvent;
use crate::services::{NewEquipment, Subject};

const ENTITY: &str = "equipments";

/// POST /api/equipments
/// Creates the equipment together with its first movement.
pub async fn create_equipment(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Subject>,
    JsonBody(payload): JsonBody<NewEquipment>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state
        .movement_service()
        .create_equipment(subject.employee_id, payload)
        .await?;

    state.notify(ENTITY);
    state.hub().publish(NotificationEvent::LocationsChanged {
        equipment_ids: vec![id],
    });

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn get_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<EquipmentView>, ApiError> {
    let id = validate_id(id)?;
    Ok(Json(state.movement_service().equipment(id).await?))
}

pub async fn update_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<UpdateEquipmentRequest>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id)?;
    state
        .store()
        .equipment_repo()
        .update(id, &payload.serial_number, payload.profile_id)
        .await?;
    state.notify(ENTITY);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/equipments/{id}/locations
pub async fn equipment_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MovementView>>, ApiError> {
    let id = validate_id(id)?;
    Ok(Json(state.movement_service().history(id).await?))
}

/// GET /api/equipments/{id}/location
pub async fn equipment_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MovementView>, ApiError> {
    let id = validate_id(id)?;
    Ok(Json(state.movement_service().latest(id).await?))
}

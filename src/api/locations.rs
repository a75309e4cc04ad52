use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::extract::JsonBody;
use super::validation::validate_id;
use super::{ApiError, AppState, IdsResponse, LocationParams, TransferBody};
use crate::db::MovementView;
use crate::domain::Page;
use crate::domain::events::NotificationEvent;
use crate::services::Subject;

/// GET /api/locations?to_department_id=
/// Equipment currently in the department, or in storage when the parameter
/// is absent or zero.
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationParams>,
) -> Result<Json<Page<MovementView>>, ApiError> {
    let department = params.to_department_id.filter(|id| *id != 0);
    if let Some(id) = department {
        validate_id(id)?;
    }

    Ok(Json(
        state.movement_service().current_locations(department).await?,
    ))
}

/// POST /api/locations
/// Appends a sequence of movements atomically.
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Subject>,
    JsonBody(payload): JsonBody<TransferBody>,
) -> Result<(StatusCode, Json<IdsResponse>), ApiError> {
    let mut equipment_ids: Vec<i64> = payload.requests.iter().map(|r| r.equipment_id).collect();
    equipment_ids.sort_unstable();
    equipment_ids.dedup();

    let ids = state
        .movement_service()
        .transfer(subject.employee_id, payload.requests)
        .await?;

    state
        .hub()
        .publish(NotificationEvent::LocationsChanged { equipment_ids });

    Ok((StatusCode::CREATED, Json(IdsResponse { ids })))
}

/// DELETE /api/locations/{id}
/// Removes a movement, or both movements of its replace pair.
pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let equipment_ids = state.movement_service().delete_movement(id).await?;

    state
        .hub()
        .publish(NotificationEvent::LocationsChanged { equipment_ids });

    Ok(StatusCode::NO_CONTENT)
}

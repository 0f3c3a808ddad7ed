use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::shift;
use crate::error::AppError;
use crate::models::shift::{Shift, ShiftDetail};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shifts", post(schedule_shift))
        .route("/shifts/:id", get(get_shift))
        .route("/shifts/:id/end", post(end_shift))
        .route("/drivers/:id/shifts", get(list_driver_shifts))
        .route("/drivers/:id/shifts/start", post(start_shift))
        .route("/drivers/:id/shifts/active", get(active_shift))
}

#[derive(Deserialize)]
pub struct ScheduleShiftRequest {
    pub driver_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct EndShiftRequest {
    pub driver_id: Uuid,
}

async fn schedule_shift(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScheduleShiftRequest>,
) -> Result<(StatusCode, Json<Shift>), AppError> {
    let shift = shift::schedule(&state, payload.driver_id, payload.date).await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

async fn start_shift(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Shift>, AppError> {
    Ok(Json(shift::start(&state, driver_id).await?))
}

async fn end_shift(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EndShiftRequest>,
) -> Result<Json<ShiftDetail>, AppError> {
    Ok(Json(shift::end(&state, id, payload.driver_id).await?))
}

async fn get_shift(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShiftDetail>, AppError> {
    Ok(Json(shift::get(&state, id).await?))
}

async fn list_driver_shifts(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Vec<Shift>>, AppError> {
    Ok(Json(shift::list_for_driver(&state, driver_id).await?))
}

async fn active_shift(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Shift>, AppError> {
    shift::active_shift_for(&state, driver_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} has no active shift")))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::allocation;
use crate::error::AppError;
use crate::models::allocation::{Allocation, AllocationChanges};
use crate::models::reference::Vehicle;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/allocations", post(create_allocation).get(list_allocations))
        .route(
            "/allocations/:id",
            get(get_allocation)
                .patch(update_allocation)
                .delete(delete_allocation),
        )
        .route("/available-vehicles", get(available_vehicles))
        .route("/drivers/:id/allocation", get(driver_allocation))
}

#[derive(Deserialize)]
pub struct CreateAllocationRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

async fn create_allocation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAllocationRequest>,
) -> Result<(StatusCode, Json<Allocation>), AppError> {
    let allocation =
        allocation::allocate(&state, payload.vehicle_id, payload.driver_id, payload.date).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

async fn list_allocations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<Vec<Allocation>> {
    let date = query.date.unwrap_or_else(|| state.today());
    Json(allocation::list_for_date(&state, date).await)
}

async fn get_allocation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Allocation>, AppError> {
    Ok(Json(allocation::get(&state, id).await?))
}

async fn update_allocation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AllocationChanges>,
) -> Result<Json<Allocation>, AppError> {
    Ok(Json(allocation::modify(&state, id, payload).await?))
}

async fn delete_allocation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    allocation::release(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn available_vehicles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<Vec<Vehicle>> {
    let date = query.date.unwrap_or_else(|| state.today());
    Json(allocation::available_vehicles(&state, date).await)
}

async fn driver_allocation(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Allocation>, AppError> {
    let date = query.date.unwrap_or_else(|| state.today());
    allocation::for_driver_on(&state, driver_id, date)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("driver {driver_id} has no allocation on {date}"))
        })
}

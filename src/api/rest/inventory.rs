use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::inventory;
use crate::error::AppError;
use crate::models::inventory::{InventoryAdjustment, InventoryFilter, InventoryItem};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inventory", get(list_inventory))
        .route("/inventory/:id", get(get_inventory))
        .route("/inventory/:id/adjust", post(adjust_inventory))
        .route("/inventory/:id/adjustments", get(list_adjustments))
}

#[derive(Deserialize)]
pub struct AdjustInventoryRequest {
    pub delta: i64,
    pub reason: Option<String>,
}

async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<InventoryFilter>,
) -> Json<Vec<InventoryItem>> {
    Json(inventory::list(&state, &filter).await)
}

async fn get_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(inventory::get(&state, id).await?))
}

async fn adjust_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    let reason = payload.reason.unwrap_or_default();
    Ok(Json(
        inventory::adjust(&state, id, payload.delta, &reason).await?,
    ))
}

async fn list_adjustments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InventoryAdjustment>>, AppError> {
    Ok(Json(inventory::adjustments(&state, id).await?))
}

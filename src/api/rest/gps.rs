use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::telemetry;
use crate::error::AppError;
use crate::models::gps::GpsLocation;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/gps", post(record_gps))
        .route("/vehicles/:id/gps", get(vehicle_history))
        .route("/vehicles/:id/gps/latest", get(vehicle_latest))
}

#[derive(Deserialize)]
pub struct RecordGpsRequest {
    pub vehicle_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub shift_id: Option<Uuid>,
}

async fn record_gps(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecordGpsRequest>,
) -> Result<(StatusCode, Json<GpsLocation>), AppError> {
    let ping = telemetry::admit(
        &state,
        payload.vehicle_id,
        payload.latitude,
        payload.longitude,
        payload.recorded_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ping)))
}

async fn vehicle_history(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<GpsLocation>>, AppError> {
    Ok(Json(
        telemetry::history(&state, vehicle_id, query.shift_id).await?,
    ))
}

async fn vehicle_latest(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<GpsLocation>, AppError> {
    Ok(Json(telemetry::latest(&state, vehicle_id).await?))
}

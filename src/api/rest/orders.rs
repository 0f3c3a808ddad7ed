use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::order::{self, NewOrder};
use crate::error::AppError;
use crate::models::order::{Order, OrderDetail, OrderFilter};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/assign", post(assign_order))
        .route("/orders/:id/start", post(start_order))
        .route("/orders/:id/complete", post(complete_order))
        .route("/orders/:id/fail", post(fail_order))
}

#[derive(Deserialize)]
pub struct AssignOrderRequest {
    pub driver_id: Uuid,
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct DriverActionRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct FailOrderRequest {
    pub driver_id: Uuid,
    pub reason: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = order::create(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<OrderFilter>,
) -> Json<Vec<Order>> {
    Json(order::list(&state, &filter).await)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    Ok(Json(order::get(&state, id).await?))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    order::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOrderRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(
        order::assign(&state, id, payload.driver_id, payload.date).await?,
    ))
}

async fn start_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    Ok(Json(order::start(&state, id, payload.driver_id).await?))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    Ok(Json(order::complete(&state, id, payload.driver_id).await?))
}

async fn fail_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailOrderRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    let reason = payload.reason.unwrap_or_default();
    Ok(Json(
        order::fail(&state, id, payload.driver_id, &reason).await?,
    ))
}

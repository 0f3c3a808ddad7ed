pub mod allocations;
pub mod gps;
pub mod inventory;
pub mod orders;
pub mod reference;
pub mod shifts;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(reference::router())
        .merge(allocations::router())
        .merge(shifts::router())
        .merge(orders::router())
        .merge(inventory::router())
        .merge(gps::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    allocations: usize,
    shifts: usize,
    active_shifts: usize,
    orders: usize,
    gps_locations: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let counts = state.store.begin().await.counts();
    Json(HealthResponse {
        status: "ok",
        allocations: counts.allocations,
        shifts: counts.shifts,
        active_shifts: counts.active_shifts,
        orders: counts.orders,
        gps_locations: counts.gps_locations,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

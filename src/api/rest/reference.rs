use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::gps::GeoPoint;
use crate::models::reference::{Driver, Location, Product, Vehicle};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
        .route("/vehicles", post(create_vehicle).get(list_vehicles))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/locations", post(create_location).get(list_locations))
        .route("/locations/:id", get(get_location))
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub license_number: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub registration: String,
    pub capacity: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub position: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub unit: Option<String>,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = state
        .reference
        .create_driver(&payload.name, payload.license_number)?;
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.reference.drivers())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.reference.driver(id)?))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let vehicle = state
        .reference
        .create_vehicle(&payload.registration, payload.capacity)?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<Vehicle>> {
    Json(state.reference.vehicles())
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(state.reference.vehicle(id)?))
}

async fn create_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let location = state
        .reference
        .create_location(&payload.name, payload.position)?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<Location>> {
    Json(state.reference.locations())
}

async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(state.reference.location(id)?))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let unit = payload.unit.unwrap_or_else(|| "unit".to_string());
    let product = state.reference.create_product(&payload.name, &unit)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(State(state): State<Arc<AppState>>) -> Json<Vec<Product>> {
    Json(state.reference.products())
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.reference.product(id)?))
}

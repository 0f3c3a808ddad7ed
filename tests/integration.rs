use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use fleet_dispatch::api::rest::router;
use fleet_dispatch::clock::FixedClock;
use fleet_dispatch::state::{utc, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const TODAY: &str = "2026-01-21";

fn setup() -> axum::Router {
    let today = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
    let clock = Arc::new(FixedClock::at_date(today));
    let state = AppState::with_clock(1024, clock, utc());
    router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, json_request("POST", uri, body)).await
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, get_request(uri)).await
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}

struct Fleet {
    driver: String,
    vehicle: String,
    terminal: String,
    diesel: String,
}

async fn seed(app: &axum::Router) -> Fleet {
    let (status, driver) = post(app, "/drivers", json!({ "name": "D1" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, vehicle) = post(
        app,
        "/vehicles",
        json!({ "registration": "V1", "capacity": 20000 }),
    )
    .await;
    let (_, terminal) = post(app, "/locations", json!({ "name": "T1" })).await;
    let (_, diesel) = post(
        app,
        "/products",
        json!({ "name": "Diesel", "unit": "litre" }),
    )
    .await;

    Fleet {
        driver: id_of(&driver),
        vehicle: id_of(&vehicle),
        terminal: id_of(&terminal),
        diesel: id_of(&diesel),
    }
}

async fn stock(app: &axum::Router, fleet: &Fleet) -> i64 {
    let (status, rows) = get(
        app,
        &format!(
            "/inventory?location_id={}&product_id={}",
            fleet.terminal, fleet.diesel
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    rows.as_array()
        .unwrap()
        .first()
        .map(|row| row["quantity"].as_i64().unwrap())
        .unwrap_or(0)
}

/// Allocates, creates an assigned 5000 l order and starts the shift.
async fn prepare_day(app: &axum::Router, fleet: &Fleet) -> (String, String) {
    let (status, _) = post(
        app,
        "/allocations",
        json!({ "vehicle_id": fleet.vehicle, "driver_id": fleet.driver, "date": TODAY }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = post(
        app,
        "/orders",
        json!({
            "destination_id": fleet.terminal,
            "product_id": fleet.diesel,
            "quantity": 5000,
            "driver_id": fleet.driver,
            "date": TODAY
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "assigned");

    let (status, shift) = post(
        app,
        &format!("/drivers/{}/shifts/start", fleet.driver),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shift["status"], "active");

    (id_of(&order), id_of(&shift))
}

#[tokio::test]
async fn health_returns_ok() {
    let app = router(Arc::new(AppState::new(16)));
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["active_shifts"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_shifts"));
}

#[tokio::test]
async fn blank_driver_name_returns_422() {
    let app = setup();
    let (status, body) = post(&app, "/drivers", json!({ "name": "  " })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn completed_delivery_credits_inventory_and_allows_clock_out() {
    let app = setup();
    let fleet = seed(&app).await;
    let (order_id, shift_id) = prepare_day(&app, &fleet).await;
    assert_eq!(stock(&app, &fleet).await, 0);

    let (status, started) = post(
        &app,
        &format!("/orders/{order_id}/start"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "in_progress");
    assert_eq!(started["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(started["attempts"][0]["status"], "in_progress");

    let (status, completed) = post(
        &app,
        &format!("/orders/{order_id}/complete"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert_eq!(stock(&app, &fleet).await, 5000);

    let (status, ended) = post(
        &app,
        &format!("/shifts/{shift_id}/end"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["status"], "completed");
    assert_eq!(ended["orders"][0]["id"], order_id.as_str());

    let (status, order) = get(&app, &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "completed");
    let attempts = order["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["status"], "completed");
    assert_eq!(attempts[0]["shift_id"], shift_id.as_str());
}

#[tokio::test]
async fn failed_delivery_keeps_reason_and_leaves_inventory() {
    let app = setup();
    let fleet = seed(&app).await;
    let (order_id, shift_id) = prepare_day(&app, &fleet).await;

    post(
        &app,
        &format!("/orders/{order_id}/start"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;

    let (status, body) = post(
        &app,
        &format!("/orders/{order_id}/fail"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION");

    let (status, failed) = post(
        &app,
        &format!("/orders/{order_id}/fail"),
        json!({ "driver_id": fleet.driver, "reason": "Pump malfunction" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["attempts"][0]["status"], "failed");
    assert_eq!(failed["attempts"][0]["failure_reason"], "Pump malfunction");
    assert_eq!(stock(&app, &fleet).await, 0);

    let (status, ended) = post(
        &app,
        &format!("/shifts/{shift_id}/end"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["status"], "completed");
}

#[tokio::test]
async fn allocation_conflicts_name_the_exclusivity_rule() {
    let app = setup();
    let fleet = seed(&app).await;
    let (_, second_driver) = post(&app, "/drivers", json!({ "name": "D2" })).await;
    let (_, second_vehicle) = post(&app, "/vehicles", json!({ "registration": "V2" })).await;

    let (status, _) = post(
        &app,
        "/allocations",
        json!({ "vehicle_id": fleet.vehicle, "driver_id": fleet.driver, "date": TODAY }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(
        &app,
        "/allocations",
        json!({ "vehicle_id": fleet.vehicle, "driver_id": id_of(&second_driver), "date": TODAY }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("vehicle"));

    let (status, body) = post(
        &app,
        "/allocations",
        json!({ "vehicle_id": id_of(&second_vehicle), "driver_id": fleet.driver, "date": TODAY }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("driver"));

    let (status, available) = get(&app, &format!("/available-vehicles?date={TODAY}")).await;
    assert_eq!(status, StatusCode::OK);
    let available = available.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["registration"], "V2");
}

#[tokio::test]
async fn past_allocation_is_rejected() {
    let app = setup();
    let fleet = seed(&app).await;
    let (status, _) = post(
        &app,
        "/allocations",
        json!({ "vehicle_id": fleet.vehicle, "driver_id": fleet.driver, "date": "2026-01-20" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn shift_start_without_allocation_returns_400() {
    let app = setup();
    let fleet = seed(&app).await;
    let (status, body) = post(
        &app,
        &format!("/drivers/{}/shifts/start", fleet.driver),
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn shift_end_lists_blocking_orders() {
    let app = setup();
    let fleet = seed(&app).await;
    let (order_id, shift_id) = prepare_day(&app, &fleet).await;

    let (status, body) = post(
        &app,
        &format!("/shifts/{shift_id}/end"),
        json!({ "driver_id": fleet.driver }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["order_ids"], json!([order_id]));
    assert!(body["error"].as_str().unwrap().contains("1 order(s)"));

    let (_, shift) = get(&app, &format!("/drivers/{}/shifts/active", fleet.driver)).await;
    assert_eq!(shift["id"], shift_id.as_str());
}

#[tokio::test]
async fn gps_is_admitted_only_during_an_active_shift() {
    let app = setup();
    let fleet = seed(&app).await;
    let ping = json!({ "vehicle_id": fleet.vehicle, "latitude": 53.55, "longitude": 9.99 });

    let (status, _) = post(&app, "/gps", ping.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, shift_id) = prepare_day(&app, &fleet).await;
    let (status, stored) = post(&app, "/gps", ping).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["shift_id"], shift_id.as_str());

    let (status, latest) = get(&app, &format!("/vehicles/{}/gps/latest", fleet.vehicle)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], stored["id"]);

    let (status, _) = post(
        &app,
        "/gps",
        json!({
            "vehicle_id": "00000000-0000-0000-0000-000000000000",
            "latitude": 53.55,
            "longitude": 9.99
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let (status, body) = get(&app, &format!("/orders/{fake_id}")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

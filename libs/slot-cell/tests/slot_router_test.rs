use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use directory_cell::{DoctorProfile, MemoryDirectory};
use shared_models::time::ClinicClock;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use slot_cell::{slot_routes, MemorySlotStore, SlotService, SlotState};

async fn app_with_doctor(doctor: &TestUser) -> (Router, TestConfig) {
    let config = TestConfig::default();
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert_doctor(DoctorProfile {
        id: doctor.id,
        clinic_id: Uuid::new_v4(),
        name: "Dr. Iyer".to_string(),
        email: Some(doctor.email.clone()),
        specialization: None,
        consultation_fee: 300.0,
        experience_years: None,
        is_active: true,
        device_token: None,
    }).await;

    let state = Arc::new(SlotState {
        config: Arc::new(config.to_memory_config()),
        slots: SlotService::new(Arc::new(MemorySlotStore::new()), directory),
        clock: ClinicClock::utc(),
    });
    (slot_routes(state), config)
}

async fn call(app: &Router, user: &TestUser, secret: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer(user, secret))
        .header("Content-Type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn doctor_creates_bulk_slots_and_lists_them() {
    let doctor = TestUser::doctor("iyer@example.com");
    let (app, config) = app_with_doctor(&doctor).await;

    let (status, body) = call(&app, &doctor, &config.jwt_secret, "POST", "/slots/createBulk", Some(json!({
        "date": "2026-10-22",
        "start_time": "10:00 AM",
        "end_time": "12:00 PM",
        "slot_duration": 40,
        "buffer_time": 5
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["created"], 2);

    let (_, body) = call(&app, &doctor, &config.jwt_secret, "GET", "/slots?date=2026-10-22", None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["slots"][1]["start_time"], "10:45 AM");
}

#[tokio::test]
async fn patients_cannot_manage_slots() {
    let doctor = TestUser::doctor("iyer@example.com");
    let (app, config) = app_with_doctor(&doctor).await;
    let patient = TestUser::patient("p@example.com");

    let (status, body) = call(&app, &patient, &config.jwt_secret, "POST", "/slots/create", Some(json!({
        "date": "2026-10-22",
        "start_time": "10:00",
        "end_time": "10:30"
    }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn invalid_schedule_is_a_validation_error() {
    let doctor = TestUser::doctor("iyer@example.com");
    let (app, config) = app_with_doctor(&doctor).await;

    let (status, body) = call(&app, &doctor, &config.jwt_secret, "POST", "/slots/createBulk", Some(json!({
        "date": "2026-10-22",
        "start_time": "10:00 AM",
        "end_time": "12:00 PM",
        "slot_duration": -30
    }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn bulk_delete_needs_a_date() {
    let doctor = TestUser::doctor("iyer@example.com");
    let (app, config) = app_with_doctor(&doctor).await;

    let (status, _) = call(&app, &doctor, &config.jwt_secret, "DELETE", "/slots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, &doctor, &config.jwt_secret, "DELETE", "/slots?date=2026-10-22", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);
}

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::{appointment_routes, doctor_appointment_routes, AppointmentState};
use common::Harness;
use shared_models::time::ClinicClock;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct App {
    router: Router,
    secret: String,
    harness: Harness,
    patient: TestUser,
    doctor: TestUser,
}

async fn app() -> App {
    let config = TestConfig::default();
    let harness = Harness::new().await;
    let state = Arc::new(AppointmentState {
        config: Arc::new(config.to_memory_config()),
        booking: harness.booking.clone(),
        lifecycle: harness.lifecycle.clone(),
        slots: harness.slot_service.clone(),
        directory: harness.directory.clone(),
        clock: ClinicClock::utc(),
    });

    let router = Router::new()
        .nest("/appointment", appointment_routes(state.clone()))
        .nest("/doctor", doctor_appointment_routes(state));

    App {
        router,
        secret: config.jwt_secret.clone(),
        patient: TestUser::with_id(harness.user_id, "user"),
        doctor: TestUser::with_id(harness.doctor_id, "doctor"),
        harness,
    }
}

async fn call(app: &App, user: &TestUser, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer(user, &app.secret))
        .header("Content-Type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn booking_body(app: &App, slot_id: Uuid) -> Value {
    json!({
        "doctor_id": app.harness.doctor_id,
        "slot_id": slot_id,
        "symptoms": "Palpitations",
        "payment_id": "pay_R1",
        "order_id": "order_R1"
    })
}

#[tokio::test]
async fn patient_discovers_books_and_lists() {
    let app = app().await;
    app.harness.morning_slots().await;

    let (status, body) = call(&app, &app.patient, "GET", "/appointment/doctors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["message"], "Doctors retrieved");
    assert_eq!(body["doctors"][0]["name"], "Dr. Menon");

    let uri = format!("/appointment/doctors/{}/slots?date=2026-10-21", app.harness.doctor_id);
    let (_, body) = call(&app, &app.patient, "GET", &uri, None).await;
    assert_eq!(body["total"], 4);
    let slot_id: Uuid = serde_json::from_value(body["slots"][0]["id"].clone()).unwrap();

    let (status, body) = call(&app, &app.patient, "POST", "/appointment", Some(booking_body(&app, slot_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "confirmed");
    assert_eq!(body["appointment"]["start_time"], "09:00 AM");
    assert_eq!(body["appointment"]["doctor"]["name"], "Dr. Menon");

    let (status, body) = call(&app, &app.patient, "POST", "/appointment", Some(booking_body(&app, slot_id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = call(&app, &app.patient, "GET", "/appointment", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["message"], "Appointments retrieved");
}

#[tokio::test]
async fn cancelling_twice_is_an_illegal_transition() {
    let app = app().await;
    let booked = app.harness.book_first_slot().await;
    let uri = format!("/appointment/{}/cancel", booked.id);

    let (status, _) = call(&app, &app.patient, "PUT", &uri, Some(json!({ "reason": "Feeling better" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, &app.patient, "PUT", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "illegal_transition");
}

#[tokio::test]
async fn doctor_routes_are_closed_to_patients() {
    let app = app().await;
    let booked = app.harness.book_first_slot().await;
    let uri = format!("/doctor/appointments/{}/complete", booked.id);
    let body = json!({ "diagnosis": "Sinus tachycardia" });

    let (status, _) = call(&app, &app.patient, "PUT", &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, response) = call(&app, &app.doctor, "PUT", &uri, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["appointment"]["status"], "completed");

    let (_, response) = call(&app, &app.doctor, "GET", "/doctor/appointments?date=2026-10-21&status=completed", None).await;
    assert_eq!(response["total"], 1);
}

#[tokio::test]
async fn strangers_cannot_read_an_appointment() {
    let app = app().await;
    let booked = app.harness.book_first_slot().await;
    let uri = format!("/appointment/{}", booked.id);

    let stranger = TestUser::patient("stranger@example.com");
    let (status, body) = call(&app, &stranger, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, &app.doctor, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, &app.patient, "GET", &format!("/appointment/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = app().await;
    let request = Request::builder()
        .uri("/appointment/doctors")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_input_gets_the_validation_envelope() {
    let app = app().await;

    let (status, body) = call(&app, &app.patient, "POST", "/appointment", Some(json!({ "slot_id": "not-a-uuid" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].is_string());

    let (status, body) = call(&app, &app.patient, "GET", "/appointment/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(&app, &app.doctor, "GET", "/doctor/appointments?status=archived", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn patient_can_cancel_without_a_body() {
    let app = app().await;
    let booked = app.harness.book_first_slot().await;
    let uri = format!("/appointment/{}/cancel", booked.id);

    let (status, body) = call(&app, &app.patient, "PUT", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment cancelled");
    assert_eq!(body["appointment"]["status"], "cancelled");
    assert_eq!(body["appointment"]["cancelled_by"], "user");
    assert!(body["appointment"]["cancellation_reason"].is_null());
}

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    AppointmentFilter, AppointmentStatus, AppointmentStore, AppointmentUpdate, CancelledBy,
    SupabaseAppointmentStore,
};
use notification_cell::ReminderLead;
use shared_database::SupabaseClient;
use shared_models::time::DayRange;
use shared_utils::test_utils::TestConfig;

fn store_for(server: &MockServer) -> SupabaseAppointmentStore {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn row(id: Uuid, start_time: &str, status: &str) -> Value {
    json!({
        "id": id,
        "user_id": Uuid::new_v4(),
        "doctor_id": Uuid::new_v4(),
        "clinic_id": Uuid::new_v4(),
        "slot_id": Uuid::new_v4(),
        "appointment_date": "2026-10-21",
        "start_time": start_time,
        "end_time": "11:30 AM",
        "amount": 500.0,
        "payment_id": "pay_1",
        "order_id": "order_1",
        "payment_method": "online",
        "payment_status": "paid",
        "status": status,
        "created_at": "2026-10-01T08:00:00Z",
        "updated_at": "2026-10-01T08:00:00Z"
    })
}

#[tokio::test]
async fn transition_is_conditional_on_the_prior_status() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "in.(pending,confirmed)"))
        .and(body_partial_json(json!({ "status": "cancelled", "cancelled_by": "doctor" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, "09:00 AM", "cancelled")])))
        .expect(1)
        .mount(&server)
        .await;

    let update = AppointmentUpdate::cancel(CancelledBy::Doctor, Some("Unwell".to_string()), Utc::now());
    let updated = store_for(&server)
        .transition(id, &AppointmentStatus::ACTIVE, update)
        .await
        .unwrap();

    assert_eq!(updated.map(|a| a.status), Some(AppointmentStatus::Cancelled));
}

#[tokio::test]
async fn a_lost_transition_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let update = AppointmentUpdate::complete("Migraine".to_string(), None, Vec::new(), Utc::now());
    let result = store_for(&server)
        .transition(Uuid::new_v4(), &[AppointmentStatus::Confirmed], update)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn reminder_claim_requires_an_unset_marker() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("reminder_30m_sent_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, "09:00 AM", "confirmed")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.claim_reminder(id, ReminderLead::ThirtyMinutes, Utc::now()).await.unwrap());
    assert!(!store.claim_reminder(id, ReminderLead::ThirtyMinutes, Utc::now()).await.unwrap());
}

#[tokio::test]
async fn listing_orders_by_wall_clock_not_text() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let (afternoon, morning) = (Uuid::new_v4(), Uuid::new_v4());

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(afternoon, "01:00 PM", "confirmed"),
            row(morning, "11:00 AM", "confirmed"),
        ])))
        .mount(&server)
        .await;

    let filter = AppointmentFilter {
        doctor_id: Some(doctor_id),
        day: Some(DayRange::for_date(chrono::NaiveDate::from_ymd_opt(2026, 10, 21).unwrap())),
        ..Default::default()
    };
    let listed = store_for(&server).list(&filter).await.unwrap();

    assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![morning, afternoon]);
}

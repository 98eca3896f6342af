use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::SupabaseClient;
use shared_models::time::{DayRange, WallTime};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use slot_cell::{NewSlot, SlotError, SlotStore, SupabaseSlotStore};

fn store_for(server: &MockServer) -> SupabaseSlotStore {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseSlotStore::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn reserve_is_a_conditional_patch() {
    let server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let mut row = MockSupabaseResponses::slot_response(slot_id, Uuid::new_v4(), Uuid::new_v4(), "2026-10-21");
    row["is_booked"] = json!(true);
    row["appointment_id"] = json!(appointment_id);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .and(query_param("is_available", "eq.true"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let slot = store_for(&server).reserve(slot_id, appointment_id).await.unwrap();
    assert!(slot.is_booked);
    assert_eq!(slot.appointment_id, Some(appointment_id));
}

#[tokio::test]
async fn lost_reservation_reports_already_booked() {
    let server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let mut current = MockSupabaseResponses::slot_response(slot_id, Uuid::new_v4(), Uuid::new_v4(), "2026-10-21");
    current["is_booked"] = json!(true);
    current["appointment_id"] = json!(Uuid::new_v4());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&server)
        .await;

    let result = store_for(&server).reserve(slot_id, Uuid::new_v4()).await;
    assert_matches!(result, Err(SlotError::SlotAlreadyBooked));
}

#[tokio::test]
async fn unique_violation_maps_to_duplicate_slot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505"),
        ))
        .mount(&server)
        .await;

    let result = store_for(&server).create(NewSlot {
        doctor_id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
        start_time: WallTime::from_hm(9, 0).unwrap(),
        end_time: WallTime::from_hm(9, 30).unwrap(),
        duration: 30,
        buffer_time: 0,
    }).await;

    assert_matches!(result, Err(SlotError::DuplicateSlot));
}

#[tokio::test]
async fn find_available_queries_a_half_open_day_and_sorts_locally() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let mut afternoon = MockSupabaseResponses::slot_response(Uuid::new_v4(), doctor_id, clinic_id, "2026-10-21");
    afternoon["start_time"] = json!("01:00 PM");
    afternoon["end_time"] = json!("01:30 PM");
    let morning = MockSupabaseResponses::slot_response(Uuid::new_v4(), doctor_id, clinic_id, "2026-10-21");

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("is_available", "eq.true"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([afternoon, morning])))
        .mount(&server)
        .await;

    let day = DayRange::for_date(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
    let slots = store_for(&server).find_available(doctor_id, day).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start_time, WallTime::from_hm(9, 0).unwrap());
    assert_eq!(slots[1].start_time, WallTime::from_hm(13, 0).unwrap());
}

#[tokio::test]
async fn deleting_a_booked_slot_is_refused() {
    let server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let mut booked = MockSupabaseResponses::slot_response(slot_id, Uuid::new_v4(), Uuid::new_v4(), "2026-10-21");
    booked["is_booked"] = json!(true);

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/slots"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([booked])))
        .mount(&server)
        .await;

    assert_matches!(store_for(&server).delete(slot_id).await, Err(SlotError::SlotBooked));
}

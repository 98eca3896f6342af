use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use directory_cell::{DoctorFilter, ParticipantDirectory};
use shared_config::AppConfig;
use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;
use shared_models::time::ClinicClock;
use shared_utils::extractor::{OptionalJson, ValidJson, ValidPath, ValidQuery};
use slot_cell::{SlotDateQuery, SlotService};

use crate::models::{
    BookAppointmentRequest, CancelAppointmentRequest, CompleteAppointmentRequest,
    DoctorAppointmentsQuery, UpdatePrescriptionRequest,
};
use crate::services::{AppointmentBookingService, AppointmentLifecycleService};

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: AppointmentBookingService,
    pub lifecycle: AppointmentLifecycleService,
    pub slots: SlotService,
    pub directory: Arc<dyn ParticipantDirectory>,
    pub clock: ClinicClock,
}

// ==============================================================================
// PATIENT APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::User)?;
    let details = state.booking.book(principal.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "appointment": details,
    })))
}

pub async fn list_my_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::User)?;
    let appointments = state.lifecycle.list_for_user(principal.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointments retrieved",
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(appointment_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let details = state.lifecycle.get_for(&principal, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment retrieved",
        "appointment": details,
    })))
}

pub async fn cancel_my_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(appointment_id): ValidPath<Uuid>,
    OptionalJson(request): OptionalJson<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::User)?;
    let reason = request.and_then(|r| r.reason);
    let details = state.lifecycle.cancel_by_user(principal.id, appointment_id, reason).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled",
        "appointment": details,
    })))
}

// ==============================================================================
// DISCOVERY HANDLERS
// ==============================================================================

pub async fn list_doctors(
    State(state): State<Arc<AppointmentState>>,
    ValidQuery(filter): ValidQuery<DoctorFilter>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.directory.list_doctors(&filter).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctors retrieved",
        "doctors": doctors,
        "total": doctors.len(),
    })))
}

pub async fn list_doctor_slots(
    State(state): State<Arc<AppointmentState>>,
    ValidPath(doctor_id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<SlotDateQuery>,
) -> Result<Json<Value>, AppError> {
    let date = query.date.unwrap_or_else(|| state.clock.today(Utc::now()));
    let slots = state.slots.available_for(doctor_id, date).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Available slots retrieved",
        "date": date,
        "slots": slots,
        "total": slots.len(),
    })))
}

// ==============================================================================
// DOCTOR APPOINTMENT HANDLERS
// ==============================================================================

pub async fn list_doctor_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidQuery(query): ValidQuery<DoctorAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let appointments = state.lifecycle
        .list_for_doctor(principal.id, query.date, query.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointments retrieved",
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(appointment_id): ValidPath<Uuid>,
    ValidJson(request): ValidJson<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let details = state.lifecycle.complete(principal.id, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Consultation completed",
        "appointment": details,
    })))
}

pub async fn doctor_cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(appointment_id): ValidPath<Uuid>,
    ValidJson(request): ValidJson<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let details = state.lifecycle
        .cancel_by_doctor(principal.id, appointment_id, request.reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled",
        "appointment": details,
    })))
}

pub async fn update_prescription(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(appointment_id): ValidPath<Uuid>,
    ValidJson(request): ValidJson<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let details = state.lifecycle
        .update_prescription(principal.id, appointment_id, request.prescription)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription updated",
        "appointment": details,
    })))
}

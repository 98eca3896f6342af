use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;
use shared_models::time::ClinicClock;
use shared_utils::extractor::{ValidJson, ValidPath, ValidQuery};

use crate::models::{BulkCreateSlotsRequest, CreateSlotRequest, SlotAvailabilityRequest, SlotDateQuery};
use crate::services::SlotService;

pub struct SlotState {
    pub config: Arc<AppConfig>,
    pub slots: SlotService,
    pub clock: ClinicClock,
}

// ==============================================================================
// DOCTOR SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let slot = state.slots.create_slot(principal.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot created",
        "slot": slot,
    })))
}

#[axum::debug_handler]
pub async fn create_bulk_slots(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<BulkCreateSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let report = state.slots.create_bulk(principal.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} slots created", report.created),
        "requested": report.requested,
        "created": report.created,
        "duplicates": report.duplicates,
        "failed": report.failed,
        "errors": report.errors,
        "slots": report.slots,
    })))
}

pub async fn list_slots(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidQuery(query): ValidQuery<SlotDateQuery>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let date = query.date.unwrap_or_else(|| state.clock.today(Utc::now()));
    let slots = state.slots.list_for_doctor(principal.id, date).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slots retrieved",
        "date": date,
        "slots": slots,
        "total": slots.len(),
    })))
}

pub async fn delete_slot(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(slot_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    state.slots.delete_slot(principal.id, slot_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted",
    })))
}

pub async fn delete_slots_for_date(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidQuery(query): ValidQuery<SlotDateQuery>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let date = query.date
        .ok_or_else(|| AppError::ValidationError("date query parameter is required".to_string()))?;
    let deleted = state.slots.delete_for_date(principal.id, date).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} slots deleted", deleted),
        "deleted": deleted,
    })))
}

pub async fn set_slot_availability(
    State(state): State<Arc<SlotState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(slot_id): ValidPath<Uuid>,
    ValidJson(request): ValidJson<SlotAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Doctor)?;
    let slot = state.slots.set_availability(principal.id, slot_id, request.is_available).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot availability updated",
        "slot": slot,
    })))
}

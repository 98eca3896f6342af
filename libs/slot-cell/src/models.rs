use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::DirectoryError;
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::time::{TimeParseError, WallTime};

pub const DEFAULT_SLOT_DURATION: i32 = 30;

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    /// Minutes.
    pub duration: i32,
    /// Idle minutes after the slot before the next one starts.
    pub buffer_time: i32,
    pub is_available: bool,
    pub is_booked: bool,
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn is_bookable(&self) -> bool {
        self.is_available && !self.is_booked
    }

    /// Identity used by the uniqueness invariant.
    pub fn key(&self) -> (Uuid, NaiveDate, WallTime, WallTime) {
        (self.doctor_id, self.date, self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub duration: i32,
    pub buffer_time: i32,
}

impl NewSlot {
    pub fn into_slot(self, now: DateTime<Utc>) -> Slot {
        Slot {
            id: Uuid::new_v4(),
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration,
            buffer_time: self.buffer_time,
            is_available: true,
            is_booked: false,
            appointment_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub buffer_time: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateSlotsRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub slot_duration: Option<i32>,
    pub buffer_time: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotDateQuery {
    pub date: Option<NaiveDate>,
}

/// Outcome of a bulk create. Duplicates are counted, never reported as errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkCreateReport {
    pub requested: usize,
    pub created: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub slots: Vec<Slot>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlotError {
    #[error("Invalid schedule configuration: {0}")]
    InvalidScheduleConfig(String),

    #[error("A slot already exists for this doctor, date and time")]
    DuplicateSlot,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is already booked")]
    SlotAlreadyBooked,

    #[error("Slot is not available")]
    SlotNotAvailable,

    #[error("Slot is booked and cannot be deleted")]
    SlotBooked,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Slot belongs to another doctor")]
    NotSlotOwner,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<TimeParseError> for SlotError {
    fn from(err: TimeParseError) -> Self {
        SlotError::ValidationError(err.to_string())
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::InvalidScheduleConfig(_) | SlotError::ValidationError(_) => {
                AppError::ValidationError(err.to_string())
            }
            SlotError::DuplicateSlot
            | SlotError::SlotAlreadyBooked
            | SlotError::SlotNotAvailable
            | SlotError::SlotBooked => AppError::Conflict(err.to_string()),
            SlotError::SlotNotFound | SlotError::DoctorNotFound => AppError::NotFound(err.to_string()),
            SlotError::NotSlotOwner => AppError::Forbidden(err.to_string()),
            SlotError::DatabaseError(e) => AppError::Database(e.to_string()),
            SlotError::Directory(e) => e.into(),
        }
    }
}

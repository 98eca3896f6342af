use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::{DirectoryError, ParticipantSummary};
use notification_cell::AppointmentSnapshot;
use shared_database::DatabaseError;
use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;
use shared_models::time::{DayRange, WallTime};
use slot_cell::SlotError;

pub const DEFAULT_PAYMENT_METHOD: &str = "online";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub slot_id: Uuid,
    /// Copied from the slot at booking time.
    pub appointment_date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    /// Consultation fee at booking time. Never re-read from the doctor.
    pub amount: f64,
    pub payment_id: String,
    pub order_id: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub reports: Vec<ReportAttachment>,
    pub diagnosis: Option<String>,
    pub consultation_notes: Option<String>,
    #[serde(default)]
    pub prescription: Vec<PrescriptionItem>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_30m_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_24h_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Owner, assigned doctor, owning clinic, or an admin.
    pub fn is_visible_to(&self, principal: &Principal) -> bool {
        match principal.role {
            Role::User => self.user_id == principal.id,
            Role::Doctor => self.doctor_id == principal.id,
            Role::Clinic => self.clinic_id == principal.id,
            Role::Admin => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 2] = [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        )
    }

    pub fn check_cancellable(&self) -> Result<(), AppointmentError> {
        if self.can_transition_to(AppointmentStatus::Cancelled) {
            return Ok(());
        }
        match self {
            AppointmentStatus::Cancelled => Err(AppointmentError::AlreadyCancelled),
            _ => Err(AppointmentError::CannotCancelCompleted),
        }
    }

    pub fn check_completable(&self) -> Result<(), AppointmentError> {
        if self.can_transition_to(AppointmentStatus::Completed) {
            return Ok(());
        }
        match self {
            AppointmentStatus::Cancelled => Err(AppointmentError::CannotCompleteCancelled),
            AppointmentStatus::Completed => Err(AppointmentError::AlreadyCompleted),
            _ => Err(AppointmentError::InvalidStatusTransition(*self)),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    User,
    Doctor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub medicine: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

/// A file already uploaded to object storage; only the reference is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAttachment {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Appointment plus display summaries of everyone involved.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub user: Option<ParticipantSummary>,
    pub doctor: Option<ParticipantSummary>,
    pub clinic: Option<ParticipantSummary>,
}

impl AppointmentDetails {
    pub fn snapshot(&self) -> AppointmentSnapshot {
        let a = &self.appointment;
        AppointmentSnapshot {
            appointment_id: a.id,
            user_id: a.user_id,
            doctor_id: a.doctor_id,
            clinic_id: a.clinic_id,
            appointment_date: a.appointment_date,
            start_time: a.start_time,
            end_time: a.end_time,
            amount: a.amount,
            user_name: self.user.as_ref().map(|p| p.name.clone()),
            doctor_name: self.doctor.as_ref().map(|p| p.name.clone()),
            clinic_name: self.clinic.as_ref().map(|p| p.name.clone()),
            cancellation_reason: a.cancellation_reason.clone(),
        }
    }
}

// ==============================================================================
// STORAGE MODELS
// ==============================================================================

/// Fields written by a lifecycle transition. `None` leaves a column untouched.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentUpdate {
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelledBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Vec<PrescriptionItem>>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentUpdate {
    pub fn cancel(by: CancelledBy, reason: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: AppointmentStatus::Cancelled,
            cancelled_by: Some(by),
            cancellation_reason: reason,
            cancelled_at: Some(now),
            diagnosis: None,
            consultation_notes: None,
            prescription: None,
            updated_at: now,
        }
    }

    pub fn complete(diagnosis: String, consultation_notes: Option<String>,
                    prescription: Vec<PrescriptionItem>, now: DateTime<Utc>) -> Self {
        Self {
            status: AppointmentStatus::Completed,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            diagnosis: Some(diagnosis),
            consultation_notes,
            prescription: Some(prescription),
            updated_at: now,
        }
    }

    pub fn apply(&self, appointment: &mut Appointment) {
        appointment.status = self.status;
        if let Some(by) = self.cancelled_by {
            appointment.cancelled_by = Some(by);
        }
        if let Some(reason) = &self.cancellation_reason {
            appointment.cancellation_reason = Some(reason.clone());
        }
        if let Some(at) = self.cancelled_at {
            appointment.cancelled_at = Some(at);
        }
        if let Some(diagnosis) = &self.diagnosis {
            appointment.diagnosis = Some(diagnosis.clone());
        }
        if let Some(notes) = &self.consultation_notes {
            appointment.consultation_notes = Some(notes.clone());
        }
        if let Some(prescription) = &self.prescription {
            appointment.prescription = prescription.clone();
        }
        appointment.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub user_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub day: Option<DayRange>,
    pub statuses: Vec<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.user_id.map_or(true, |id| appointment.user_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.day.map_or(true, |day| day.contains(appointment.appointment_date))
            && (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub slot_id: Option<Uuid>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub reports: Vec<ReportAttachment>,
}

/// A booking request with every required field present.
#[derive(Debug, Clone)]
pub struct ValidatedBooking {
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub payment_id: String,
    pub order_id: String,
    pub payment_method: String,
    pub reports: Vec<ReportAttachment>,
}

fn required(value: Option<String>, field: &str) -> Result<String, AppointmentError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppointmentError::ValidationError(format!("{} is required", field)))
}

impl BookAppointmentRequest {
    pub fn validate(self) -> Result<ValidatedBooking, AppointmentError> {
        let doctor_id = self.doctor_id
            .ok_or_else(|| AppointmentError::ValidationError("doctor_id is required".to_string()))?;
        let slot_id = self.slot_id
            .ok_or_else(|| AppointmentError::ValidationError("slot_id is required".to_string()))?;
        let payment_id = required(self.payment_id, "payment_id")?;
        let order_id = required(self.order_id, "order_id")?;

        if let Some(report) = self.reports.iter().find(|r| r.url.trim().is_empty()) {
            return Err(AppointmentError::ValidationError(format!("report '{}' has no url", report.name)));
        }

        Ok(ValidatedBooking {
            doctor_id,
            slot_id,
            symptoms: self.symptoms,
            notes: self.notes,
            payment_id,
            order_id,
            payment_method: self.payment_method
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            reports: self.reports,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub diagnosis: Option<String>,
    pub consultation_notes: Option<String>,
    #[serde(default)]
    pub prescription: Vec<PrescriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub prescription: Vec<PrescriptionItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is already booked")]
    SlotAlreadyBooked,

    #[error("Slot is not available")]
    SlotNotAvailable,

    #[error("Slot does not belong to the selected doctor")]
    SlotDoctorMismatch,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Completed appointments cannot be cancelled")]
    CannotCancelCompleted,

    #[error("Cancelled appointments cannot be completed")]
    CannotCompleteCancelled,

    #[error("Appointment is already completed")]
    AlreadyCompleted,

    #[error("Appointment cannot be completed in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<SlotError> for AppointmentError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::SlotNotFound => AppointmentError::SlotNotFound,
            SlotError::SlotAlreadyBooked | SlotError::SlotBooked => AppointmentError::SlotAlreadyBooked,
            SlotError::SlotNotAvailable => AppointmentError::SlotNotAvailable,
            SlotError::DoctorNotFound => AppointmentError::DoctorNotFound,
            SlotError::DatabaseError(e) => AppointmentError::DatabaseError(e),
            SlotError::Directory(e) => AppointmentError::Directory(e),
            other => AppointmentError::ValidationError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::ValidationError(_) | AppointmentError::SlotDoctorMismatch => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::SlotAlreadyBooked | AppointmentError::SlotNotAvailable => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::SlotNotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::AlreadyCancelled
            | AppointmentError::CannotCancelCompleted
            | AppointmentError::CannotCompleteCancelled
            | AppointmentError::AlreadyCompleted
            | AppointmentError::InvalidStatusTransition(_) => AppError::IllegalTransition(err.to_string()),
            AppointmentError::DatabaseError(e) => AppError::Database(e.to_string()),
            AppointmentError::Directory(e) => e.into(),
        }
    }
}

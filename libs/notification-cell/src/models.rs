use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;
use shared_models::time::WallTime;

// ==============================================================================
// NOTIFICATION RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    User,
    Doctor,
    Clinic,
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientType::User => write!(f, "user"),
            RecipientType::Doctor => write!(f, "doctor"),
            RecipientType::Clinic => write!(f, "clinic"),
        }
    }
}

impl From<RecipientType> for Role {
    fn from(recipient_type: RecipientType) -> Self {
        match recipient_type {
            RecipientType::User => Role::User,
            RecipientType::Doctor => Role::Doctor,
            RecipientType::Clinic => Role::Clinic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub recipient_type: RecipientType,
    pub recipient_id: Uuid,
}

impl Recipient {
    pub fn user(id: Uuid) -> Self {
        Self { recipient_type: RecipientType::User, recipient_id: id }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { recipient_type: RecipientType::Doctor, recipient_id: id }
    }

    pub fn clinic(id: Uuid) -> Self {
        Self { recipient_type: RecipientType::Clinic, recipient_id: id }
    }

    /// The inbox owned by the calling principal. Admins have none.
    pub fn for_principal(principal: &Principal) -> Result<Self, AppError> {
        match principal.role {
            Role::User => Ok(Self::user(principal.id)),
            Role::Doctor => Ok(Self::doctor(principal.id)),
            Role::Clinic => Ok(Self::clinic(principal.id)),
            Role::Admin => Err(AppError::Forbidden("Admins do not receive notifications".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAppointment,
    AppointmentConfirmed,
    AppointmentCancelled,
    AppointmentReminder,
    PrescriptionReady,
    PaymentSuccess,
    General,
}

impl NotificationKind {
    pub fn default_icon(&self) -> &'static str {
        match self {
            NotificationKind::NewAppointment => "calendar-plus",
            NotificationKind::AppointmentConfirmed => "calendar-check",
            NotificationKind::AppointmentCancelled => "calendar-x",
            NotificationKind::AppointmentReminder => "alarm",
            NotificationKind::PrescriptionReady => "file-medical",
            NotificationKind::PaymentSuccess => "credit-card",
            NotificationKind::General => "bell",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::NewAppointment => "new_appointment",
            NotificationKind::AppointmentConfirmed => "appointment_confirmed",
            NotificationKind::AppointmentCancelled => "appointment_cancelled",
            NotificationKind::AppointmentReminder => "appointment_reminder",
            NotificationKind::PrescriptionReady => "prescription_ready",
            NotificationKind::PaymentSuccess => "payment_success",
            NotificationKind::General => "general",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_type: RecipientType,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub icon: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn recipient(&self) -> Recipient {
        Recipient {
            recipient_type: self.recipient_type,
            recipient_id: self.recipient_id,
        }
    }
}

/// One rendered message addressed to one or more recipients.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub recipients: Vec<Recipient>,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub data: Value,
}

impl NotificationDraft {
    pub fn to_notification(&self, recipient: Recipient, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_type: recipient.recipient_type,
            recipient_id: recipient.recipient_id,
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind,
            icon: Some(self.kind.default_icon().to_string()),
            link: self.link.clone(),
            is_read: false,
            read_at: None,
            data: self.data.clone(),
            created_at: now,
        }
    }
}

// ==============================================================================
// EVENTS
// ==============================================================================

/// What the dispatcher needs to know about an appointment to render messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub amount: f64,
    pub user_name: Option<String>,
    pub doctor_name: Option<String>,
    pub clinic_name: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderLead {
    ThirtyMinutes,
    TwentyFourHours,
}

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    NewAppointment(AppointmentSnapshot),
    PaymentReceived(AppointmentSnapshot),
    CancelledByUser(AppointmentSnapshot),
    CancelledByDoctor(AppointmentSnapshot),
    ConsultationCompleted(AppointmentSnapshot),
    PrescriptionUpdated(AppointmentSnapshot),
    Reminder {
        lead: ReminderLead,
        appointment: AppointmentSnapshot,
    },
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationEvent::NewAppointment(_) => "new_appointment",
            NotificationEvent::PaymentReceived(_) => "payment_received",
            NotificationEvent::CancelledByUser(_) => "cancelled_by_user",
            NotificationEvent::CancelledByDoctor(_) => "cancelled_by_doctor",
            NotificationEvent::ConsultationCompleted(_) => "consultation_completed",
            NotificationEvent::PrescriptionUpdated(_) => "prescription_updated",
            NotificationEvent::Reminder { lead: ReminderLead::ThirtyMinutes, .. } => "reminder_30m",
            NotificationEvent::Reminder { lead: ReminderLead::TwentyFourHours, .. } => "reminder_24h",
        }
    }

    pub fn appointment(&self) -> &AppointmentSnapshot {
        match self {
            NotificationEvent::NewAppointment(snapshot)
            | NotificationEvent::PaymentReceived(snapshot)
            | NotificationEvent::CancelledByUser(snapshot)
            | NotificationEvent::CancelledByDoctor(snapshot)
            | NotificationEvent::ConsultationCompleted(snapshot)
            | NotificationEvent::PrescriptionUpdated(snapshot) => snapshot,
            NotificationEvent::Reminder { appointment, .. } => appointment,
        }
    }
}

// ==============================================================================
// PUSH
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    Failed(String),
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTokenRequest {
    pub device_token: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
            NotificationError::ValidationError(msg) => AppError::ValidationError(msg),
            NotificationError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}

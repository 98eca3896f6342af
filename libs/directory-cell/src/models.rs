use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub specialization: Option<String>,
    /// Current fee. Appointments copy it at booking time.
    pub consultation_fee: f64,
    pub experience_years: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub device_token: Option<String>,
}

impl DoctorProfile {
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            detail: self.specialization.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, skip_serializing)]
    pub device_token: Option<String>,
}

impl UserProfile {
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            detail: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default, skip_serializing)]
    pub device_token: Option<String>,
}

impl ClinicProfile {
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            detail: self.address.clone(),
        }
    }
}

/// Display-only projection embedded in appointment responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Specialization for doctors, address for clinics, phone for users.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    pub specialization: Option<String>,
    pub clinic_id: Option<Uuid>,
}

impl DoctorFilter {
    pub fn matches(&self, doctor: &DoctorProfile) -> bool {
        if !doctor.is_active {
            return false;
        }
        if let Some(clinic_id) = self.clinic_id {
            if doctor.clinic_id != clinic_id {
                return false;
            }
        }
        match (&self.specialization, &doctor.specialization) {
            (Some(wanted), Some(actual)) => actual.eq_ignore_ascii_case(wanted),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("No {0} record with id {1}")]
    NotFound(&'static str, Uuid),

    #[error("Role {0} has no directory record")]
    UnsupportedRole(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(table, id) => AppError::NotFound(format!("No {} record with id {}", table, id)),
            DirectoryError::UnsupportedRole(role) => AppError::Forbidden(format!("Role {} has no profile", role)),
            DirectoryError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

fn default_true() -> bool {
    true
}

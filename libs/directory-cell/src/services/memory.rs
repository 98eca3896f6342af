use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::models::{ClinicProfile, DirectoryError, DoctorFilter, DoctorProfile, UserProfile};
use crate::services::directory::ParticipantDirectory;

/// Process-local directory for the memory storage backend and tests.
#[derive(Default)]
pub struct MemoryDirectory {
    doctors: RwLock<HashMap<Uuid, DoctorProfile>>,
    users: RwLock<HashMap<Uuid, UserProfile>>,
    clinics: RwLock<HashMap<Uuid, ClinicProfile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_doctor(&self, doctor: DoctorProfile) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn insert_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn insert_clinic(&self, clinic: ClinicProfile) {
        self.clinics.write().await.insert(clinic.id, clinic);
    }

    pub async fn set_consultation_fee(&self, doctor_id: Uuid, fee: f64) -> Result<(), DirectoryError> {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors.get_mut(&doctor_id)
            .ok_or(DirectoryError::NotFound("doctors", doctor_id))?;
        doctor.consultation_fee = fee;
        Ok(())
    }
}

#[async_trait]
impl ParticipantDirectory for MemoryDirectory {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, DirectoryError> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_clinic(&self, clinic_id: Uuid) -> Result<Option<ClinicProfile>, DirectoryError> {
        Ok(self.clinics.read().await.get(&clinic_id).cloned())
    }

    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let mut doctors: Vec<DoctorProfile> = self.doctors.read().await
            .values()
            .filter(|doctor| filter.matches(doctor))
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn device_token(&self, role: Role, id: Uuid) -> Result<Option<String>, DirectoryError> {
        let token = match role {
            Role::User => self.users.read().await.get(&id).and_then(|u| u.device_token.clone()),
            Role::Doctor => self.doctors.read().await.get(&id).and_then(|d| d.device_token.clone()),
            Role::Clinic => self.clinics.read().await.get(&id).and_then(|c| c.device_token.clone()),
            Role::Admin => None,
        };
        Ok(token)
    }

    async fn set_device_token(&self, role: Role, id: Uuid, token: &str) -> Result<(), DirectoryError> {
        let token = Some(token.to_string());
        match role {
            Role::User => {
                let mut users = self.users.write().await;
                let user = users.get_mut(&id).ok_or(DirectoryError::NotFound("users", id))?;
                user.device_token = token;
            }
            Role::Doctor => {
                let mut doctors = self.doctors.write().await;
                let doctor = doctors.get_mut(&id).ok_or(DirectoryError::NotFound("doctors", id))?;
                doctor.device_token = token;
            }
            Role::Clinic => {
                let mut clinics = self.clinics.write().await;
                let clinic = clinics.get_mut(&id).ok_or(DirectoryError::NotFound("clinics", id))?;
                clinic.device_token = token;
            }
            Role::Admin => return Err(DirectoryError::UnsupportedRole(role.to_string())),
        }
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{all_rows, first_row, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{ClinicProfile, DirectoryError, DoctorFilter, DoctorProfile, UserProfile};

/// Read access to the people and clinics the scheduling core talks about.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, DirectoryError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DirectoryError>;

    async fn find_clinic(&self, clinic_id: Uuid) -> Result<Option<ClinicProfile>, DirectoryError>;

    /// Active doctors matching the filter, ordered by name.
    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>, DirectoryError>;

    async fn device_token(&self, role: Role, id: Uuid) -> Result<Option<String>, DirectoryError>;

    async fn set_device_token(&self, role: Role, id: Uuid, token: &str) -> Result<(), DirectoryError>;
}

fn table_for(role: Role) -> Result<&'static str, DirectoryError> {
    match role {
        Role::User => Ok("users"),
        Role::Doctor => Ok("doctors"),
        Role::Clinic => Ok("clinics"),
        Role::Admin => Err(DirectoryError::UnsupportedRole(role.to_string())),
    }
}

pub struct SupabaseDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_one<T>(&self, table: &str, id: Uuid) -> Result<Option<T>, DirectoryError>
    where
        T: serde::de::DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?id=eq.{}", table, id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(first_row(rows)?)
    }
}

#[async_trait]
impl ParticipantDirectory for SupabaseDirectory {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, DirectoryError> {
        debug!("Fetching doctor {}", doctor_id);
        self.fetch_one("doctors", doctor_id).await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DirectoryError> {
        self.fetch_one("users", user_id).await
    }

    async fn find_clinic(&self, clinic_id: Uuid) -> Result<Option<ClinicProfile>, DirectoryError> {
        self.fetch_one("clinics", clinic_id).await
    }

    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let mut query_parts = vec!["is_active=eq.true".to_string()];
        if let Some(specialization) = &filter.specialization {
            query_parts.push(format!("specialization=ilike.{}", urlencoding::encode(specialization)));
        }
        if let Some(clinic_id) = filter.clinic_id {
            query_parts.push(format!("clinic_id=eq.{}", clinic_id));
        }
        query_parts.push("order=name.asc".to_string());

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(all_rows(rows)?)
    }

    async fn device_token(&self, role: Role, id: Uuid) -> Result<Option<String>, DirectoryError> {
        let table = match table_for(role) {
            Ok(table) => table,
            Err(_) => return Ok(None),
        };

        let path = format!("/rest/v1/{}?id=eq.{}&select=device_token", table, id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(rows.first()
            .and_then(|row| row["device_token"].as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }

    async fn set_device_token(&self, role: Role, id: Uuid, token: &str) -> Result<(), DirectoryError> {
        let table = table_for(role)?;
        let path = format!("/rest/v1/{}?id=eq.{}", table, id);

        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({ "device_token": token })))
            .await?;

        if rows.is_empty() {
            return Err(DirectoryError::NotFound(table, id));
        }
        Ok(())
    }
}

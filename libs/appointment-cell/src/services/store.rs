use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use notification_cell::ReminderLead;
use shared_database::{all_rows, first_row, DatabaseError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, AppointmentUpdate,
    PrescriptionItem,
};

/// Appointment persistence. Status changes and reminder markers are
/// conditional writes: they only apply while the row still matches.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Matching appointments ordered by date then start time.
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    /// Applies `update` only while the status is one of `from`. `None` means
    /// the row is gone or another writer moved it first.
    async fn transition(&self, appointment_id: Uuid, from: &[AppointmentStatus],
                        update: AppointmentUpdate) -> Result<Option<Appointment>, AppointmentError>;

    async fn set_prescription(&self, appointment_id: Uuid, prescription: Vec<PrescriptionItem>)
        -> Result<Option<Appointment>, AppointmentError>;

    /// Stamps the reminder marker if unset. `true` means this caller owns the reminder.
    async fn claim_reminder(&self, appointment_id: Uuid, lead: ReminderLead,
                            at: DateTime<Utc>) -> Result<bool, AppointmentError>;
}

pub(crate) fn reminder_column(lead: ReminderLead) -> &'static str {
    match lead {
        ReminderLead::ThirtyMinutes => "reminder_30m_sent_at",
        ReminderLead::TwentyFourHours => "reminder_24h_sent_at",
    }
}

pub(crate) fn sort_by_schedule(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        (a.appointment_date, a.start_time, a.created_at).cmp(&(b.appointment_date, b.start_time, b.created_at))
    });
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn status_list(statuses: &[AppointmentStatus]) -> String {
        let joined = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
        format!("in.{}", urlencoding::encode(&format!("({})", joined)))
    }

    fn filter_query(filter: &AppointmentFilter) -> String {
        let mut query = vec!["select=*".to_string()];
        if let Some(user_id) = filter.user_id {
            query.push(format!("user_id=eq.{}", user_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(day) = filter.day {
            query.push(format!("appointment_date=gte.{}", day.start));
            query.push(format!("appointment_date=lt.{}", day.end));
        }
        if !filter.statuses.is_empty() {
            query.push(format!("status={}", Self::status_list(&filter.statuses)));
        }
        query.join("&")
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(&appointment).map_err(DatabaseError::from)?;
        let rows = self.supabase
            .mutate_returning(Method::POST, "/rest/v1/appointments", Some(body))
            .await?;
        Ok(first_row(rows)?.unwrap_or(appointment))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(first_row(rows)?)
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", Self::filter_query(filter));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        // start_time is "hh:mm AM" text, so SQL ordering would be lexical.
        let mut appointments: Vec<Appointment> = all_rows(rows)?;
        sort_by_schedule(&mut appointments);
        Ok(appointments)
    }

    async fn transition(&self, appointment_id: Uuid, from: &[AppointmentStatus],
                        update: AppointmentUpdate) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status={}",
                           appointment_id, Self::status_list(from));
        let body = serde_json::to_value(&update).map_err(DatabaseError::from)?;
        let rows = self.supabase.mutate_returning(Method::PATCH, &path, Some(body)).await?;

        let updated: Option<Appointment> = first_row(rows)?;
        if updated.is_none() {
            debug!("Transition of appointment {} to {} matched no row", appointment_id, update.status);
        }
        Ok(updated)
    }

    async fn set_prescription(&self, appointment_id: Uuid, prescription: Vec<PrescriptionItem>)
        -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "prescription": prescription,
                "updated_at": Utc::now().to_rfc3339(),
            })))
            .await?;
        Ok(first_row(rows)?)
    }

    async fn claim_reminder(&self, appointment_id: Uuid, lead: ReminderLead,
                            at: DateTime<Utc>) -> Result<bool, AppointmentError> {
        let column = reminder_column(lead);
        let path = format!("/rest/v1/appointments?id=eq.{}&{}=is.null", appointment_id, column);
        let mut body = serde_json::Map::new();
        body.insert(column.to_string(), json!(at.to_rfc3339()));

        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(Value::Object(body)))
            .await?;
        Ok(!rows.is_empty())
    }
}

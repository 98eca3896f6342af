use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use notification_cell::ReminderLead;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, AppointmentUpdate,
    PrescriptionItem,
};
use crate::services::store::{sort_by_schedule, AppointmentStore};

#[derive(Default)]
pub struct MemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.appointments.write().await.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments.values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_by_schedule(&mut found);
        Ok(found)
    }

    async fn transition(&self, appointment_id: Uuid, from: &[AppointmentStatus],
                        update: AppointmentUpdate) -> Result<Option<Appointment>, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&appointment_id) {
            Some(appointment) if from.contains(&appointment.status) => {
                update.apply(appointment);
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_prescription(&self, appointment_id: Uuid, prescription: Vec<PrescriptionItem>)
        -> Result<Option<Appointment>, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.get_mut(&appointment_id).map(|appointment| {
            appointment.prescription = prescription;
            appointment.updated_at = Utc::now();
            appointment.clone()
        }))
    }

    async fn claim_reminder(&self, appointment_id: Uuid, lead: ReminderLead,
                            at: DateTime<Utc>) -> Result<bool, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let Some(appointment) = appointments.get_mut(&appointment_id) else {
            return Ok(false);
        };

        let marker = match lead {
            ReminderLead::ThirtyMinutes => &mut appointment.reminder_30m_sent_at,
            ReminderLead::TwentyFourHours => &mut appointment.reminder_24h_sent_at,
        };
        if marker.is_some() {
            return Ok(false);
        }
        *marker = Some(at);
        Ok(true)
    }
}

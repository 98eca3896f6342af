use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use directory_cell::ParticipantDirectory;
use notification_cell::{NotificationEvent, NotificationOutbox};
use shared_models::auth::Principal;
use shared_models::time::DayRange;
use slot_cell::SlotStore;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentFilter, AppointmentStatus,
    AppointmentUpdate, CancelledBy, CompleteAppointmentRequest, PrescriptionItem,
};
use crate::services::participants::describe;
use crate::services::store::AppointmentStore;

/// Reads and status transitions after booking.
///
/// Transitions are conditional writes on the current status. When a write
/// matches nothing the row is re-read so the caller gets the error for the
/// state that won, not a generic conflict.
#[derive(Clone)]
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    slots: Arc<dyn SlotStore>,
    directory: Arc<dyn ParticipantDirectory>,
    outbox: NotificationOutbox,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        slots: Arc<dyn SlotStore>,
        directory: Arc<dyn ParticipantDirectory>,
        outbox: NotificationOutbox,
    ) -> Self {
        Self { appointments, slots, directory, outbox }
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments.get(appointment_id).await?.ok_or(AppointmentError::NotFound)
    }

    async fn load_for_doctor(&self, doctor_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if appointment.doctor_id != doctor_id {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    async fn lost_race(&self, appointment_id: Uuid,
                       guard: fn(&AppointmentStatus) -> Result<(), AppointmentError>) -> AppointmentError {
        match self.appointments.get(appointment_id).await {
            Ok(Some(current)) => match guard(&current.status) {
                Err(e) => e,
                Ok(()) => AppointmentError::InvalidStatusTransition(current.status),
            },
            Ok(None) => AppointmentError::NotFound,
            Err(e) => e,
        }
    }

    pub async fn get_for(&self, principal: &Principal, appointment_id: Uuid)
        -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if !appointment.is_visible_to(principal) {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(describe(self.directory.as_ref(), appointment).await)
    }

    /// The user's appointments, most recent first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter { user_id: Some(user_id), ..Default::default() };
        let mut appointments = self.appointments.list(&filter).await?;
        appointments.reverse();
        Ok(appointments)
    }

    /// The doctor's schedule in start order, optionally narrowed to one day and status.
    pub async fn list_for_doctor(&self, doctor_id: Uuid, date: Option<NaiveDate>,
                                 status: Option<AppointmentStatus>) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            doctor_id: Some(doctor_id),
            day: date.map(DayRange::for_date),
            statuses: status.into_iter().collect(),
            ..Default::default()
        };
        self.appointments.list(&filter).await
    }

    /// The slot stays booked: a slot given up by its patient is not offered again.
    #[instrument(skip(self, reason))]
    pub async fn cancel_by_user(&self, user_id: Uuid, appointment_id: Uuid, reason: Option<String>)
        -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if appointment.user_id != user_id {
            return Err(AppointmentError::Unauthorized);
        }
        appointment.status.check_cancellable()?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let update = AppointmentUpdate::cancel(CancelledBy::User, reason, Utc::now());
        let Some(cancelled) = self.appointments
            .transition(appointment_id, &AppointmentStatus::ACTIVE, update)
            .await? else {
            return Err(self.lost_race(appointment_id, AppointmentStatus::check_cancellable).await);
        };

        info!("Appointment {} cancelled by user {}", appointment_id, user_id);
        let details = describe(self.directory.as_ref(), cancelled).await;
        self.outbox.enqueue(NotificationEvent::CancelledByUser(details.snapshot()));
        Ok(details)
    }

    /// Releases the slot so another patient can book it.
    #[instrument(skip(self, reason))]
    pub async fn cancel_by_doctor(&self, doctor_id: Uuid, appointment_id: Uuid, reason: Option<String>)
        -> Result<AppointmentDetails, AppointmentError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppointmentError::ValidationError("Cancellation reason is required".to_string()))?;

        let appointment = self.load_for_doctor(doctor_id, appointment_id).await?;
        appointment.status.check_cancellable()?;

        let update = AppointmentUpdate::cancel(CancelledBy::Doctor, Some(reason), Utc::now());
        let Some(cancelled) = self.appointments
            .transition(appointment_id, &AppointmentStatus::ACTIVE, update)
            .await? else {
            return Err(self.lost_race(appointment_id, AppointmentStatus::check_cancellable).await);
        };

        match self.slots.release(cancelled.slot_id, cancelled.id).await {
            Ok(_) => debug!("Slot {} released", cancelled.slot_id),
            Err(e) => warn!("Could not release slot {} after cancelling appointment {}: {}",
                            cancelled.slot_id, cancelled.id, e),
        }

        info!("Appointment {} cancelled by doctor {}", appointment_id, doctor_id);
        let details = describe(self.directory.as_ref(), cancelled).await;
        self.outbox.enqueue(NotificationEvent::CancelledByDoctor(details.snapshot()));
        Ok(details)
    }

    #[instrument(skip(self, request))]
    pub async fn complete(&self, doctor_id: Uuid, appointment_id: Uuid, request: CompleteAppointmentRequest)
        -> Result<AppointmentDetails, AppointmentError> {
        let diagnosis = request.diagnosis
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppointmentError::ValidationError("Diagnosis is required".to_string()))?;

        let appointment = self.load_for_doctor(doctor_id, appointment_id).await?;
        appointment.status.check_completable()?;

        let update = AppointmentUpdate::complete(diagnosis, request.consultation_notes,
                                                 request.prescription, Utc::now());
        let Some(completed) = self.appointments
            .transition(appointment_id, &[AppointmentStatus::Confirmed], update)
            .await? else {
            return Err(self.lost_race(appointment_id, AppointmentStatus::check_completable).await);
        };

        info!("Appointment {} completed by doctor {}", appointment_id, doctor_id);
        let details = describe(self.directory.as_ref(), completed).await;
        self.outbox.enqueue(NotificationEvent::ConsultationCompleted(details.snapshot()));
        Ok(details)
    }

    /// Replaces the prescription in any status; follow-up edits after completion are expected.
    pub async fn update_prescription(&self, doctor_id: Uuid, appointment_id: Uuid,
                                     prescription: Vec<PrescriptionItem>) -> Result<AppointmentDetails, AppointmentError> {
        if let Some(item) = prescription.iter().find(|p| p.medicine.trim().is_empty()) {
            return Err(AppointmentError::ValidationError(
                format!("Prescription item with dosage '{}' has no medicine", item.dosage)));
        }

        self.load_for_doctor(doctor_id, appointment_id).await?;
        let updated = self.appointments
            .set_prescription(appointment_id, prescription)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        info!("Prescription updated for appointment {}", appointment_id);
        let details = describe(self.directory.as_ref(), updated).await;
        self.outbox.enqueue(NotificationEvent::PrescriptionUpdated(details.snapshot()));
        Ok(details)
    }
}

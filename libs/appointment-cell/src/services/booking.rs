use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use directory_cell::ParticipantDirectory;
use notification_cell::{NotificationEvent, NotificationOutbox};
use slot_cell::SlotStore;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    PaymentStatus,
};
use crate::services::participants::describe;
use crate::services::store::AppointmentStore;

/// Turns a paid booking request into a confirmed appointment holding one slot.
#[derive(Clone)]
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    slots: Arc<dyn SlotStore>,
    directory: Arc<dyn ParticipantDirectory>,
    outbox: NotificationOutbox,
}

impl AppointmentBookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        slots: Arc<dyn SlotStore>,
        directory: Arc<dyn ParticipantDirectory>,
        outbox: NotificationOutbox,
    ) -> Self {
        Self { appointments, slots, directory, outbox }
    }

    /// Preconditions are checked in a fixed order so the caller always sees
    /// the first one that fails: slot exists, not booked, available, belongs
    /// to the doctor, doctor exists. The reservation itself is the
    /// authoritative check; the earlier reads only produce better errors.
    #[instrument(skip(self, request))]
    pub async fn book(&self, user_id: Uuid, request: BookAppointmentRequest)
        -> Result<AppointmentDetails, AppointmentError> {
        let request = request.validate()?;

        let slot = self.slots.get(request.slot_id).await?.ok_or(AppointmentError::SlotNotFound)?;
        if slot.is_booked {
            return Err(AppointmentError::SlotAlreadyBooked);
        }
        if !slot.is_available {
            return Err(AppointmentError::SlotNotAvailable);
        }
        if slot.doctor_id != request.doctor_id {
            return Err(AppointmentError::SlotDoctorMismatch);
        }
        let doctor = self.directory
            .find_doctor(request.doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let appointment_id = Uuid::new_v4();
        let slot = self.slots.reserve(slot.id, appointment_id).await?;
        debug!("Slot {} reserved for appointment {}", slot.id, appointment_id);

        let now = Utc::now();
        let appointment = Appointment {
            id: appointment_id,
            user_id,
            doctor_id: doctor.id,
            clinic_id: slot.clinic_id,
            slot_id: slot.id,
            appointment_date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            amount: doctor.consultation_fee,
            payment_id: request.payment_id,
            order_id: request.order_id,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Paid,
            status: AppointmentStatus::Confirmed,
            symptoms: request.symptoms,
            notes: request.notes,
            reports: request.reports,
            diagnosis: None,
            consultation_notes: None,
            prescription: Vec::new(),
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            reminder_30m_sent_at: None,
            reminder_24h_sent_at: None,
            created_at: now,
            updated_at: now,
        };

        let appointment = match self.appointments.insert(appointment).await {
            Ok(appointment) => appointment,
            Err(e) => {
                error!("Failed to store appointment {}, releasing slot {}: {}", appointment_id, slot.id, e);
                if let Err(release_err) = self.slots.release(slot.id, appointment_id).await {
                    warn!("Slot {} stays reserved by orphan appointment {}: {}",
                          slot.id, appointment_id, release_err);
                }
                return Err(e);
            }
        };

        info!("Appointment {} booked with doctor {} for {} {}",
              appointment.id, appointment.doctor_id, appointment.appointment_date, appointment.start_time);

        let details = describe(self.directory.as_ref(), appointment).await;
        let snapshot = details.snapshot();
        self.outbox.enqueue(NotificationEvent::NewAppointment(snapshot.clone()));
        self.outbox.enqueue(NotificationEvent::PaymentReceived(snapshot));

        Ok(details)
    }
}

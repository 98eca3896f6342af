use directory_cell::ParticipantDirectory;
use tracing::warn;

use crate::models::{Appointment, AppointmentDetails};

/// Attaches participant summaries. A failed lookup leaves that summary empty
/// rather than failing the operation that produced the appointment.
pub async fn describe(directory: &dyn ParticipantDirectory, appointment: Appointment) -> AppointmentDetails {
    let (user, doctor, clinic) = tokio::join!(
        directory.find_user(appointment.user_id),
        directory.find_doctor(appointment.doctor_id),
        directory.find_clinic(appointment.clinic_id),
    );

    let user = user.unwrap_or_else(|e| {
        warn!("User lookup for appointment {} failed: {}", appointment.id, e);
        None
    });
    let doctor = doctor.unwrap_or_else(|e| {
        warn!("Doctor lookup for appointment {} failed: {}", appointment.id, e);
        None
    });
    let clinic = clinic.unwrap_or_else(|e| {
        warn!("Clinic lookup for appointment {} failed: {}", appointment.id, e);
        None
    });

    AppointmentDetails {
        user: user.map(|u| u.summary()),
        doctor: doctor.map(|d| d.summary()),
        clinic: clinic.map(|c| c.summary()),
        appointment,
    }
}

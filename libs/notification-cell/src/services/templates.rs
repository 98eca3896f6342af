use serde_json::json;

use crate::models::{
    AppointmentSnapshot, NotificationDraft, NotificationEvent, NotificationKind, Recipient,
    RecipientType, ReminderLead,
};

/// Renders one event into the drafts each audience should receive.
pub fn render(event: &NotificationEvent) -> Vec<NotificationDraft> {
    let appt = event.appointment();
    let when = format!("{} at {}", appt.appointment_date.format("%d %b %Y"), appt.start_time);
    let user = appt.user_name.as_deref().unwrap_or("A patient");
    let doctor = appt.doctor_name.as_deref().unwrap_or("your doctor");

    match event {
        NotificationEvent::NewAppointment(_) => vec![
            draft(event, NotificationKind::AppointmentConfirmed, Recipient::user(appt.user_id),
                  "Appointment Confirmed",
                  format!("Your appointment with {} on {} is confirmed.", doctor, when)),
            draft(event, NotificationKind::NewAppointment, Recipient::doctor(appt.doctor_id),
                  "New Appointment",
                  format!("{} booked an appointment on {}.", user, when)),
            draft(event, NotificationKind::NewAppointment, Recipient::clinic(appt.clinic_id),
                  "New Appointment Booked",
                  format!("{} booked with {} on {}.", user, doctor, when)),
        ],
        NotificationEvent::PaymentReceived(_) => vec![
            draft(event, NotificationKind::PaymentSuccess, Recipient::user(appt.user_id),
                  "Payment Successful",
                  format!("Payment of {:.2} received for your appointment on {}.", appt.amount, when)),
        ],
        NotificationEvent::CancelledByUser(_) => {
            let message = with_reason(format!("{} cancelled the appointment on {}.", user, when), appt);
            vec![
                draft(event, NotificationKind::AppointmentCancelled, Recipient::doctor(appt.doctor_id),
                      "Appointment Cancelled", message.clone()),
                draft(event, NotificationKind::AppointmentCancelled, Recipient::clinic(appt.clinic_id),
                      "Appointment Cancelled", message),
            ]
        }
        NotificationEvent::CancelledByDoctor(_) => vec![
            draft(event, NotificationKind::AppointmentCancelled, Recipient::user(appt.user_id),
                  "Appointment Cancelled",
                  with_reason(format!("Your appointment with {} on {} was cancelled by the doctor.", doctor, when), appt)),
        ],
        NotificationEvent::ConsultationCompleted(_) => vec![
            draft(event, NotificationKind::PrescriptionReady, Recipient::user(appt.user_id),
                  "Consultation Completed",
                  format!("Your consultation with {} is complete. Your prescription is ready.", doctor)),
        ],
        NotificationEvent::PrescriptionUpdated(_) => vec![
            draft(event, NotificationKind::PrescriptionReady, Recipient::user(appt.user_id),
                  "Prescription Updated",
                  format!("{} updated the prescription for your appointment on {}.", doctor, when)),
        ],
        NotificationEvent::Reminder { lead: ReminderLead::ThirtyMinutes, .. } => vec![
            draft(event, NotificationKind::AppointmentReminder, Recipient::user(appt.user_id),
                  "Appointment in 30 minutes",
                  format!("Your appointment with {} starts at {}.", doctor, appt.start_time)),
            draft(event, NotificationKind::AppointmentReminder, Recipient::doctor(appt.doctor_id),
                  "Appointment in 30 minutes",
                  format!("Your appointment with {} starts at {}.", user, appt.start_time)),
        ],
        NotificationEvent::Reminder { lead: ReminderLead::TwentyFourHours, .. } => vec![
            draft(event, NotificationKind::AppointmentReminder, Recipient::user(appt.user_id),
                  "Appointment Tomorrow",
                  format!("Reminder: your appointment with {} is on {}.", doctor, when)),
        ],
    }
}

fn draft(event: &NotificationEvent, kind: NotificationKind, recipient: Recipient,
         title: &str, message: String) -> NotificationDraft {
    let appt = event.appointment();
    NotificationDraft {
        kind,
        recipients: vec![recipient],
        title: title.to_string(),
        message,
        link: Some(link_for(recipient, appt)),
        data: json!({
            "event": event.name(),
            "appointment_id": appt.appointment_id,
        }),
    }
}

fn link_for(recipient: Recipient, appt: &AppointmentSnapshot) -> String {
    match recipient.recipient_type {
        RecipientType::User => format!("/appointments/{}", appt.appointment_id),
        RecipientType::Doctor => format!("/doctor/appointments/{}", appt.appointment_id),
        RecipientType::Clinic => format!("/clinic/appointments/{}", appt.appointment_id),
    }
}

fn with_reason(message: String, appt: &AppointmentSnapshot) -> String {
    match appt.cancellation_reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("{} Reason: {}", message, reason),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::time::WallTime;
    use uuid::Uuid;

    fn snapshot() -> AppointmentSnapshot {
        AppointmentSnapshot {
            appointment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            start_time: WallTime::from_hm(9, 30).unwrap(),
            end_time: WallTime::from_hm(10, 0).unwrap(),
            amount: 500.0,
            user_name: Some("Asha".to_string()),
            doctor_name: Some("Dr. Rao".to_string()),
            clinic_name: Some("City Clinic".to_string()),
            cancellation_reason: None,
        }
    }

    fn audiences(drafts: &[NotificationDraft]) -> Vec<RecipientType> {
        drafts.iter().flat_map(|d| d.recipients.iter().map(|r| r.recipient_type)).collect()
    }

    #[test]
    fn new_appointment_reaches_user_doctor_and_clinic() {
        let drafts = render(&NotificationEvent::NewAppointment(snapshot()));
        assert_eq!(audiences(&drafts), vec![RecipientType::User, RecipientType::Doctor, RecipientType::Clinic]);
        assert_eq!(drafts[0].kind, NotificationKind::AppointmentConfirmed);
        assert!(drafts[0].message.contains("20 Oct 2026 at 09:30 AM"));
    }

    #[test]
    fn cancellations_notify_the_other_side() {
        let mut appt = snapshot();
        appt.cancellation_reason = Some("Travelling".to_string());

        let by_user = render(&NotificationEvent::CancelledByUser(appt.clone()));
        assert_eq!(audiences(&by_user), vec![RecipientType::Doctor, RecipientType::Clinic]);
        assert!(by_user[0].message.ends_with("Reason: Travelling"));

        let by_doctor = render(&NotificationEvent::CancelledByDoctor(appt));
        assert_eq!(audiences(&by_doctor), vec![RecipientType::User]);
    }

    #[test]
    fn reminders_differ_by_lead() {
        let short = render(&NotificationEvent::Reminder { lead: ReminderLead::ThirtyMinutes, appointment: snapshot() });
        assert_eq!(audiences(&short), vec![RecipientType::User, RecipientType::Doctor]);

        let long = render(&NotificationEvent::Reminder { lead: ReminderLead::TwentyFourHours, appointment: snapshot() });
        assert_eq!(audiences(&long), vec![RecipientType::User]);
        assert_eq!(long[0].data["event"], "reminder_24h");
    }
}

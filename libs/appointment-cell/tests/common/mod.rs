#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentBookingService, AppointmentLifecycleService, AppointmentStatus,
    AppointmentStore, BookAppointmentRequest, MemoryAppointmentStore, PaymentStatus,
    ReminderScheduler,
};
use directory_cell::{ClinicProfile, DoctorProfile, MemoryDirectory, UserProfile};
use notification_cell::{
    DisabledPushProvider, MemoryNotificationStore, NotificationDispatcher, NotificationOutbox,
    OutboxWorker,
};
use shared_models::time::{ClinicClock, WallTime};
use slot_cell::{BulkCreateSlotsRequest, MemorySlotStore, Slot, SlotService, SlotStore};

pub const FEE: f64 = 500.0;

pub struct Harness {
    pub appointments: Arc<MemoryAppointmentStore>,
    pub slots: Arc<MemorySlotStore>,
    pub slot_service: SlotService,
    pub directory: Arc<MemoryDirectory>,
    pub notifications: Arc<MemoryNotificationStore>,
    pub outbox: NotificationOutbox,
    pub worker: OutboxWorker,
    pub booking: AppointmentBookingService,
    pub lifecycle: AppointmentLifecycleService,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub date: NaiveDate,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryAppointmentStore::new())).await
    }

    /// Same wiring, but booking and lifecycle write through `store`.
    pub async fn with_store_override(store: Arc<dyn AppointmentStore>) -> Self {
        let mut harness = Self::new().await;
        harness.booking = AppointmentBookingService::new(
            store.clone(), harness.slots.clone(), harness.directory.clone(), harness.outbox.clone(),
        );
        harness.lifecycle = AppointmentLifecycleService::new(
            store, harness.slots.clone(), harness.directory.clone(), harness.outbox.clone(),
        );
        harness
    }

    async fn with_store(appointments: Arc<MemoryAppointmentStore>) -> Self {
        let user_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();

        let directory = Arc::new(MemoryDirectory::new());
        directory.insert_user(UserProfile {
            id: user_id,
            name: "Asha Rao".to_string(),
            email: Some("asha@example.com".to_string()),
            phone: None,
            device_token: Some("asha-device".to_string()),
        }).await;
        directory.insert_doctor(DoctorProfile {
            id: doctor_id,
            clinic_id,
            name: "Dr. Menon".to_string(),
            email: Some("menon@example.com".to_string()),
            specialization: Some("Cardiology".to_string()),
            consultation_fee: FEE,
            experience_years: Some(12),
            is_active: true,
            device_token: None,
        }).await;
        directory.insert_clinic(ClinicProfile {
            id: clinic_id,
            name: "Lakeside Clinic".to_string(),
            email: None,
            address: Some("12 Lake Road".to_string()),
            device_token: None,
        }).await;

        let slots = Arc::new(MemorySlotStore::new());
        let notifications = Arc::new(MemoryNotificationStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifications.clone(),
            directory.clone(),
            Arc::new(DisabledPushProvider),
        ));
        let (outbox, worker) = NotificationOutbox::channel(dispatcher);

        Self {
            booking: AppointmentBookingService::new(
                appointments.clone(), slots.clone(), directory.clone(), outbox.clone(),
            ),
            lifecycle: AppointmentLifecycleService::new(
                appointments.clone(), slots.clone(), directory.clone(), outbox.clone(),
            ),
            slot_service: SlotService::new(slots.clone(), directory.clone()),
            appointments,
            slots,
            directory,
            notifications,
            outbox,
            worker,
            user_id,
            doctor_id,
            clinic_id,
            date: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
        }
    }

    /// Four 30-minute slots from 09:00 to 11:00.
    pub async fn morning_slots(&self) -> Vec<Slot> {
        self.slot_service
            .create_bulk(self.doctor_id, BulkCreateSlotsRequest {
                date: self.date,
                start_time: "09:00 AM".to_string(),
                end_time: "11:00 AM".to_string(),
                slot_duration: Some(30),
                buffer_time: Some(0),
            })
            .await
            .unwrap()
            .slots
    }

    pub fn request(&self, slot_id: Uuid) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doctor_id: Some(self.doctor_id),
            slot_id: Some(slot_id),
            symptoms: Some("Chest tightness after exercise".to_string()),
            notes: None,
            payment_id: Some("pay_MkP1".to_string()),
            order_id: Some("order_MkP1".to_string()),
            payment_method: None,
            reports: Vec::new(),
        }
    }

    pub async fn book_first_slot(&self) -> Appointment {
        let slots = self.morning_slots().await;
        self.booking
            .book(self.user_id, self.request(slots[0].id))
            .await
            .unwrap()
            .appointment
    }

    pub async fn slot(&self, slot_id: Uuid) -> Slot {
        self.slots.get(slot_id).await.unwrap().unwrap()
    }

    /// An appointment stored directly, bypassing booking.
    pub async fn insert_appointment(&self, date: NaiveDate, start: WallTime, status: AppointmentStatus) -> Appointment {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
            slot_id: Uuid::new_v4(),
            appointment_date: date,
            start_time: start,
            end_time: WallTime::from_minutes(start.minutes() + 30).unwrap(),
            amount: FEE,
            payment_id: "pay_seed".to_string(),
            order_id: "order_seed".to_string(),
            payment_method: "online".to_string(),
            payment_status: PaymentStatus::Paid,
            status,
            symptoms: None,
            notes: None,
            reports: Vec::new(),
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
        self.appointments.insert(appointment).await.unwrap()
    }

    pub fn scheduler(&self) -> ReminderScheduler {
        ReminderScheduler::new(
            self.appointments.clone(),
            self.directory.clone(),
            self.outbox.clone(),
            ClinicClock::utc(),
            Duration::from_secs(60),
            WallTime::from_hm(9, 0).unwrap(),
        )
    }
}

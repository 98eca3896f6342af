use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use directory_cell::{DoctorProfile, ParticipantDirectory};
use shared_models::time::{DayRange, WallTime};

use crate::models::{
    BulkCreateReport, BulkCreateSlotsRequest, CreateSlotRequest, NewSlot, Slot, SlotError,
    DEFAULT_SLOT_DURATION,
};
use crate::services::generator::SlotGenerator;
use crate::services::store::SlotStore;

/// Doctor-facing slot management on top of a `SlotStore`.
#[derive(Clone)]
pub struct SlotService {
    store: Arc<dyn SlotStore>,
    directory: Arc<dyn ParticipantDirectory>,
}

impl SlotService {
    pub fn new(store: Arc<dyn SlotStore>, directory: Arc<dyn ParticipantDirectory>) -> Self {
        Self { store, directory }
    }

    async fn doctor(&self, doctor_id: Uuid) -> Result<DoctorProfile, SlotError> {
        self.directory
            .find_doctor(doctor_id)
            .await?
            .ok_or(SlotError::DoctorNotFound)
    }

    async fn owned_slot(&self, doctor_id: Uuid, slot_id: Uuid) -> Result<Slot, SlotError> {
        let slot = self.store.get(slot_id).await?.ok_or(SlotError::SlotNotFound)?;
        if slot.doctor_id != doctor_id {
            return Err(SlotError::NotSlotOwner);
        }
        Ok(slot)
    }

    /// One slot spanning exactly `[start, end)`.
    pub async fn create_slot(&self, doctor_id: Uuid, request: CreateSlotRequest) -> Result<Slot, SlotError> {
        let start = WallTime::parse(&request.start_time)?;
        let end = WallTime::parse(&request.end_time)?;
        if start >= end {
            return Err(SlotError::ValidationError("Start time must be before end time".to_string()));
        }
        let buffer_time = request.buffer_time.unwrap_or(0);
        if buffer_time < 0 {
            return Err(SlotError::InvalidScheduleConfig("buffer time cannot be negative".to_string()));
        }

        let doctor = self.doctor(doctor_id).await?;
        let slot = self.store.create(NewSlot {
            doctor_id,
            clinic_id: doctor.clinic_id,
            date: request.date,
            start_time: start,
            end_time: end,
            duration: (end.minutes() - start.minutes()) as i32,
            buffer_time,
        }).await?;

        info!("Created slot {} for doctor {} on {} at {}", slot.id, doctor_id, slot.date, slot.start_time);
        Ok(slot)
    }

    /// Generates and stores every slot in the window. Duplicates are skipped,
    /// other per-slot failures are collected; neither aborts the batch.
    pub async fn create_bulk(&self, doctor_id: Uuid, request: BulkCreateSlotsRequest) -> Result<BulkCreateReport, SlotError> {
        let duration = request.slot_duration.unwrap_or(DEFAULT_SLOT_DURATION);
        let buffer = request.buffer_time.unwrap_or(0);
        let generator = SlotGenerator::parse(&request.start_time, &request.end_time, duration, buffer)?;
        let doctor = self.doctor(doctor_id).await?;

        let mut report = BulkCreateReport::default();
        for (start, end) in generator {
            report.requested += 1;
            let result = self.store.create(NewSlot {
                doctor_id,
                clinic_id: doctor.clinic_id,
                date: request.date,
                start_time: start,
                end_time: end,
                duration,
                buffer_time: buffer,
            }).await;

            match result {
                Ok(slot) => {
                    report.created += 1;
                    report.slots.push(slot);
                }
                Err(SlotError::DuplicateSlot) => {
                    debug!("Skipping existing slot {} - {} on {}", start, end, request.date);
                    report.duplicates += 1;
                }
                Err(e) => {
                    warn!("Failed to create slot {} - {} on {}: {}", start, end, request.date, e);
                    report.failed += 1;
                    report.errors.push(format!("{} - {}: {}", start, end, e));
                }
            }
        }

        info!(
            "Bulk slot creation for doctor {} on {}: {} requested, {} created, {} duplicates, {} failed",
            doctor_id, request.date, report.requested, report.created, report.duplicates, report.failed
        );
        Ok(report)
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, SlotError> {
        self.store.list_for_doctor(doctor_id, DayRange::for_date(date)).await
    }

    /// Bookable slots for discovery.
    pub async fn available_for(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, SlotError> {
        self.doctor(doctor_id).await?;
        self.store.find_available(doctor_id, DayRange::for_date(date)).await
    }

    pub async fn delete_slot(&self, doctor_id: Uuid, slot_id: Uuid) -> Result<(), SlotError> {
        let slot = self.owned_slot(doctor_id, slot_id).await?;
        if slot.is_booked {
            return Err(SlotError::SlotBooked);
        }
        self.store.delete(slot_id).await?;
        info!("Deleted slot {} for doctor {}", slot_id, doctor_id);
        Ok(())
    }

    pub async fn delete_for_date(&self, doctor_id: Uuid, date: NaiveDate) -> Result<usize, SlotError> {
        let deleted = self.store.delete_unbooked(doctor_id, DayRange::for_date(date)).await?;
        info!("Deleted {} unbooked slots for doctor {} on {}", deleted, doctor_id, date);
        Ok(deleted)
    }

    pub async fn set_availability(&self, doctor_id: Uuid, slot_id: Uuid, is_available: bool) -> Result<Slot, SlotError> {
        self.owned_slot(doctor_id, slot_id).await?;
        self.store.set_availability(slot_id, is_available).await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{all_rows, first_row, DatabaseError, SupabaseClient};
use shared_models::time::DayRange;

use crate::models::{NewSlot, Slot, SlotError};

/// Slot persistence. `reserve` is the one compare-and-swap in the system:
/// implementations must flip `is_booked` in a single conditional write.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Fails with `DuplicateSlot` when (doctor, date, start, end) already exists.
    async fn create(&self, slot: NewSlot) -> Result<Slot, SlotError>;

    async fn get(&self, slot_id: Uuid) -> Result<Option<Slot>, SlotError>;

    /// Available and unbooked slots in the range, earliest first.
    async fn find_available(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError>;

    /// Every slot of the doctor in the range, earliest first.
    async fn list_for_doctor(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError>;

    /// `is_booked: false -> true` guarded by `is_available`.
    async fn reserve(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError>;

    /// Undoes a reservation held by `appointment_id` and makes the slot bookable again.
    async fn release(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError>;

    /// Deletes an unbooked slot.
    async fn delete(&self, slot_id: Uuid) -> Result<(), SlotError>;

    /// Deletes every unbooked slot of the doctor in the range, returning the count.
    async fn delete_unbooked(&self, doctor_id: Uuid, day: DayRange) -> Result<usize, SlotError>;

    /// Touches `is_available` only; a booked slot stays booked.
    async fn set_availability(&self, slot_id: Uuid, is_available: bool) -> Result<Slot, SlotError>;
}

pub(crate) fn sort_by_start(slots: &mut [Slot]) {
    slots.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
}

/// Explains why a conditional reserve matched nothing.
pub(crate) fn reserve_failure(current: Option<&Slot>) -> SlotError {
    match current {
        None => SlotError::SlotNotFound,
        Some(slot) if slot.is_booked => SlotError::SlotAlreadyBooked,
        Some(slot) if !slot.is_available => SlotError::SlotNotAvailable,
        // Released again between our write and this read; still a lost race.
        Some(_) => SlotError::SlotAlreadyBooked,
    }
}

pub struct SupabaseSlotStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSlotStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn day_filter(doctor_id: Uuid, day: DayRange) -> String {
        format!("doctor_id=eq.{}&date=gte.{}&date=lt.{}", doctor_id, day.start, day.end)
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Slot>, SlotError> {
        let path = format!("/rest/v1/slots?{}", query);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        // start_time is stored as "hh:mm AM" text, so ordering happens here rather than in SQL.
        let mut slots: Vec<Slot> = all_rows(rows)?;
        sort_by_start(&mut slots);
        Ok(slots)
    }
}

#[async_trait]
impl SlotStore for SupabaseSlotStore {
    async fn create(&self, slot: NewSlot) -> Result<Slot, SlotError> {
        let slot = slot.into_slot(Utc::now());
        let body = serde_json::to_value(&slot).map_err(DatabaseError::from)?;

        let rows = self.supabase
            .mutate_returning(Method::POST, "/rest/v1/slots", Some(body))
            .await
            .map_err(|e| if e.is_conflict() { SlotError::DuplicateSlot } else { e.into() })?;

        Ok(first_row(rows)?.unwrap_or(slot))
    }

    async fn get(&self, slot_id: Uuid) -> Result<Option<Slot>, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(first_row(rows)?)
    }

    async fn find_available(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError> {
        self.fetch(&format!(
            "{}&is_available=eq.true&is_booked=eq.false",
            Self::day_filter(doctor_id, day)
        )).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError> {
        self.fetch(&Self::day_filter(doctor_id, day)).await
    }

    async fn reserve(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.false&is_available=eq.true", slot_id);
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "is_booked": true,
                "appointment_id": appointment_id,
                "updated_at": Utc::now().to_rfc3339(),
            })))
            .await?;

        match first_row::<Slot>(rows)? {
            Some(slot) => {
                debug!("Reserved slot {} for appointment {}", slot_id, appointment_id);
                Ok(slot)
            }
            None => {
                let current = self.get(slot_id).await?;
                warn!("Reservation of slot {} lost: {:?}", slot_id, current.as_ref().map(|s| s.is_booked));
                Err(reserve_failure(current.as_ref()))
            }
        }
    }

    async fn release(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}&appointment_id=eq.{}", slot_id, appointment_id);
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "is_booked": false,
                "appointment_id": null,
                "is_available": true,
                "updated_at": Utc::now().to_rfc3339(),
            })))
            .await?;

        first_row(rows)?.ok_or(SlotError::SlotNotFound)
    }

    async fn delete(&self, slot_id: Uuid) -> Result<(), SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.false", slot_id);
        let rows = self.supabase.mutate_returning(Method::DELETE, &path, None).await?;

        if rows.is_empty() {
            return Err(match self.get(slot_id).await? {
                Some(_) => SlotError::SlotBooked,
                None => SlotError::SlotNotFound,
            });
        }
        Ok(())
    }

    async fn delete_unbooked(&self, doctor_id: Uuid, day: DayRange) -> Result<usize, SlotError> {
        let path = format!("/rest/v1/slots?{}&is_booked=eq.false", Self::day_filter(doctor_id, day));
        let rows = self.supabase.mutate_returning(Method::DELETE, &path, None).await?;
        Ok(rows.len())
    }

    async fn set_availability(&self, slot_id: Uuid, is_available: bool) -> Result<Slot, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "is_available": is_available,
                "updated_at": Utc::now().to_rfc3339(),
            })))
            .await?;

        first_row(rows)?.ok_or(SlotError::SlotNotFound)
    }
}

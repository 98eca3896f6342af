use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::time::DayRange;

use crate::models::{NewSlot, Slot, SlotError};
use crate::services::store::{reserve_failure, sort_by_start, SlotStore};

/// Slot store for the memory backend and tests. Every mutation holds the
/// write lock for its whole check-and-set, which gives `reserve` the same
/// single-winner guarantee as the conditional PATCH.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<Uuid, Slot>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    fn in_range(slot: &Slot, doctor_id: Uuid, day: DayRange) -> bool {
        slot.doctor_id == doctor_id && day.contains(slot.date)
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn create(&self, slot: NewSlot) -> Result<Slot, SlotError> {
        let slot = slot.into_slot(Utc::now());
        let mut slots = self.slots.write().await;

        if slots.values().any(|existing| existing.key() == slot.key()) {
            return Err(SlotError::DuplicateSlot);
        }

        slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn get(&self, slot_id: Uuid) -> Result<Option<Slot>, SlotError> {
        Ok(self.slots.read().await.get(&slot_id).cloned())
    }

    async fn find_available(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError> {
        let slots = self.slots.read().await;
        let mut found: Vec<Slot> = slots.values()
            .filter(|s| Self::in_range(s, doctor_id, day) && s.is_bookable())
            .cloned()
            .collect();
        sort_by_start(&mut found);
        Ok(found)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid, day: DayRange) -> Result<Vec<Slot>, SlotError> {
        let slots = self.slots.read().await;
        let mut found: Vec<Slot> = slots.values()
            .filter(|s| Self::in_range(s, doctor_id, day))
            .cloned()
            .collect();
        sort_by_start(&mut found);
        Ok(found)
    }

    async fn reserve(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&slot_id) {
            Some(slot) if slot.is_bookable() => {
                slot.is_booked = true;
                slot.appointment_id = Some(appointment_id);
                slot.updated_at = Utc::now();
                Ok(slot.clone())
            }
            other => Err(reserve_failure(other.as_deref())),
        }
    }

    async fn release(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Slot, SlotError> {
        let mut slots = self.slots.write().await;
        let slot = slots.get_mut(&slot_id)
            .filter(|s| s.appointment_id == Some(appointment_id))
            .ok_or(SlotError::SlotNotFound)?;

        slot.is_booked = false;
        slot.appointment_id = None;
        slot.is_available = true;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    async fn delete(&self, slot_id: Uuid) -> Result<(), SlotError> {
        let mut slots = self.slots.write().await;
        match slots.get(&slot_id) {
            None => Err(SlotError::SlotNotFound),
            Some(slot) if slot.is_booked => Err(SlotError::SlotBooked),
            Some(_) => {
                slots.remove(&slot_id);
                Ok(())
            }
        }
    }

    async fn delete_unbooked(&self, doctor_id: Uuid, day: DayRange) -> Result<usize, SlotError> {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, s| !(Self::in_range(s, doctor_id, day) && !s.is_booked));
        Ok(before - slots.len())
    }

    async fn set_availability(&self, slot_id: Uuid, is_available: bool) -> Result<Slot, SlotError> {
        let mut slots = self.slots.write().await;
        let slot = slots.get_mut(&slot_id).ok_or(SlotError::SlotNotFound)?;
        slot.is_available = is_available;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }
}

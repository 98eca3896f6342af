use shared_models::time::WallTime;

use crate::models::SlotError;

const MAX_MINUTES: i32 = 24 * 60;

/// Lazily walks `[start, end)` emitting `duration`-long windows, each followed
/// by `buffer` idle minutes. A window that would run past `end` is dropped.
#[derive(Debug, Clone)]
pub struct SlotGenerator {
    cursor: u32,
    end: u32,
    duration: u32,
    step: u32,
}

impl SlotGenerator {
    pub fn new(start: WallTime, end: WallTime, duration: i32, buffer: i32) -> Result<Self, SlotError> {
        if duration <= 0 {
            return Err(SlotError::InvalidScheduleConfig(
                format!("slot duration must be positive, got {}", duration),
            ));
        }
        if buffer < 0 {
            return Err(SlotError::InvalidScheduleConfig(
                format!("buffer time cannot be negative, got {}", buffer),
            ));
        }
        if duration > MAX_MINUTES || buffer > MAX_MINUTES {
            return Err(SlotError::InvalidScheduleConfig(
                format!("slot duration and buffer time are limited to {} minutes", MAX_MINUTES),
            ));
        }
        let step = duration.checked_add(buffer).ok_or_else(|| {
            SlotError::InvalidScheduleConfig("slot duration plus buffer time overflows".to_string())
        })?;

        Ok(Self {
            cursor: start.minutes(),
            end: end.minutes(),
            duration: duration.unsigned_abs(),
            step: step.unsigned_abs(),
        })
    }

    /// Parses both bounds (24-hour or AM/PM) before building the generator.
    pub fn parse(start: &str, end: &str, duration: i32, buffer: i32) -> Result<Self, SlotError> {
        let start = WallTime::parse(start)?;
        let end = WallTime::parse(end)?;
        Self::new(start, end, duration, buffer)
    }
}

impl Iterator for SlotGenerator {
    type Item = (WallTime, WallTime);

    fn next(&mut self) -> Option<Self::Item> {
        let slot_end = self.cursor + self.duration;
        if slot_end > self.end {
            return None;
        }

        let window = (WallTime::from_minutes(self.cursor)?, WallTime::from_minutes(slot_end)?);
        self.cursor += self.step;
        Some(window)
    }
}

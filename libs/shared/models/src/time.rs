//! Wall-clock and calendar-day helpers shared by the slot and appointment cells.
//!
//! Slots and appointments store their times as clinic-local wall-clock strings
//! plus a calendar date. All conversion to instants goes through [`ClinicClock`],
//! which carries the clinic's fixed UTC offset explicitly instead of relying on
//! the server's local timezone.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MINUTES_PER_DAY: u16 = 24 * 60;

fn wall_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp][Mm])?$")
            .expect("wall time pattern is a valid regex")
    })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("'{0}' is not a recognised time (expected HH:MM or hh:mm AM/PM)")]
    Format(String),

    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// A time of day with minute precision, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime(u16);

impl WallTime {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        u16::try_from(minutes)
            .ok()
            .filter(|m| *m < MINUTES_PER_DAY)
            .map(WallTime)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    /// Parses 24-hour (`14:30`, `14:30:00`) and 12-hour (`2:30 PM`, `02:30pm`) forms.
    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let trimmed = input.trim();
        let captures = wall_time_pattern()
            .captures(trimmed)
            .ok_or_else(|| TimeParseError::Format(input.to_string()))?;

        let out_of_range = || TimeParseError::OutOfRange(input.to_string());

        let hour: u32 = captures[1].parse().map_err(|_| out_of_range())?;
        let minute: u32 = captures[2].parse().map_err(|_| out_of_range())?;
        if let Some(seconds) = captures.get(3) {
            let seconds: u32 = seconds.as_str().parse().map_err(|_| out_of_range())?;
            if seconds > 59 {
                return Err(out_of_range());
            }
        }

        let hour = match captures.get(4).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(period) => {
                if hour == 0 || hour > 12 {
                    return Err(out_of_range());
                }
                match (period.as_str(), hour) {
                    ("AM", 12) => 0,
                    ("AM", h) => h,
                    ("PM", 12) => 12,
                    (_, h) => h + 12,
                }
            }
            None => hour,
        };

        Self::from_hm(hour, minute).ok_or_else(out_of_range)
    }
}

impl fmt::Display for WallTime {
    /// Canonical 12-hour rendering, e.g. `09:05 AM`. Slot identity compares on this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (display_hour, period) = match self.hour() {
            0 => (12, "AM"),
            h if h < 12 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        write!(f, "{:02}:{:02} {}", display_hour, self.minute(), period)
    }
}

impl FromStr for WallTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WallTime::parse(s)
    }
}

impl Serialize for WallTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        WallTime::parse(&raw).map_err(de::Error::custom)
    }
}

/// Half-open calendar range `[start, end)` handed to day-scoped storage queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Clinic-local calendar arithmetic with an explicit UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct ClinicClock {
    offset: FixedOffset,
}

impl ClinicClock {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes.checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
    }

    pub fn local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date()
    }

    pub fn tomorrow(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.today(now);
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }

    /// The UTC instant at which `time` occurs on `date` in clinic-local time.
    pub fn instant(&self, date: NaiveDate, time: WallTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&date.and_time(time.to_naive_time()))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Whole minutes from `now` until `time` on `date` (negative once passed).
    pub fn minutes_until(&self, now: DateTime<Utc>, date: NaiveDate, time: WallTime) -> Option<i64> {
        self.instant(date, time).map(|at| (at - now).num_minutes())
    }
}

impl Default for ClinicClock {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wt(s: &str) -> WallTime {
        WallTime::parse(s).unwrap()
    }

    #[test]
    fn parses_twelve_hour_forms() {
        assert_eq!(wt("09:00 AM").minutes(), 9 * 60);
        assert_eq!(wt("9:30pm").minutes(), 21 * 60 + 30);
        assert_eq!(wt("12:00 AM").minutes(), 0);
        assert_eq!(wt("12:15 PM").minutes(), 12 * 60 + 15);
    }

    #[test]
    fn parses_twenty_four_hour_forms() {
        assert_eq!(wt("14:30").minutes(), 14 * 60 + 30);
        assert_eq!(wt("07:05:00").minutes(), 7 * 60 + 5);
        assert_eq!(wt("0:00").minutes(), 0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(WallTime::parse("25:00"), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!(WallTime::parse("13:00 PM"), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!(WallTime::parse("00:30 AM"), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!(WallTime::parse("noon"), Err(TimeParseError::Format(_))));
        assert!(matches!(WallTime::parse("10:75"), Err(TimeParseError::OutOfRange(_))));
    }

    #[test]
    fn renders_canonically_regardless_of_input_format() {
        assert_eq!(wt("14:00").to_string(), "02:00 PM");
        assert_eq!(wt("2:00 pm").to_string(), "02:00 PM");
        assert_eq!(wt("00:10").to_string(), "12:10 AM");
        assert_eq!(wt("12:00").to_string(), "12:00 PM");
    }

    #[test]
    fn serde_uses_canonical_string() {
        let json = serde_json::to_string(&wt("09:30")).unwrap();
        assert_eq!(json, "\"09:30 AM\"");
        let back: WallTime = serde_json::from_str("\"21:45\"").unwrap();
        assert_eq!(back.to_string(), "09:45 PM");
    }

    #[test]
    fn day_range_is_half_open() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let range = DayRange::for_date(date);
        assert!(range.contains(date));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()));
    }

    #[test]
    fn clinic_clock_applies_offset() {
        // UTC+05:30
        let clock = ClinicClock::from_offset_minutes(330).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 20, 0, 0).unwrap();
        assert_eq!(clock.today(now), NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());

        let date = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let at = clock.instant(date, wt("02:00 AM")).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 10, 20, 30, 0).unwrap());
        assert_eq!(clock.minutes_until(now, date, wt("02:00 AM")), Some(30));
    }
}

// libs/provider-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

// ==============================================================================
// PROVIDER MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(default)]
    pub weekly_availability: Vec<WeeklyWindow>,
    #[serde(default, deserialize_with = "deserialize_dates")]
    pub unavailable_dates: Vec<NaiveDate>,
}

impl Provider {
    pub fn is_unavailable_on(&self, date: NaiveDate) -> bool {
        self.unavailable_dates.contains(&date)
    }

    /// Recurring windows configured for the given weekday, earliest first.
    pub fn windows_for(&self, weekday: Weekday) -> Vec<&WeeklyWindow> {
        let mut windows: Vec<&WeeklyWindow> = self
            .weekly_availability
            .iter()
            .filter(|window| window.day == weekday)
            .collect();
        windows.sort_by_key(|window| window.start_time);
        windows
    }
}

/// One recurring availability window, e.g. Mondays 09:00 to 17:00.
///
/// An `endTime` of `00:00` is read as midnight at the end of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyWindow {
    #[serde(with = "weekday_name")]
    pub day: Weekday,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
}

impl WeeklyWindow {
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start_time)
    }

    pub fn end_minute(&self) -> u32 {
        match minute_of_day(self.end_time) {
            0 => MINUTES_PER_DAY,
            minute => minute,
        }
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A slot as exchanged with the booking API: `{"time": "09:00 - 10:00", "isBooked": false}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time: String,
    #[serde(default)]
    pub is_booked: bool,
}

/// Parsed form of a slot label such as `"09:00 - 10:00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotLabel {
    start_minute: u32,
    end_minute: u32,
}

impl SlotLabel {
    pub fn from_minutes(start_minute: u32, end_minute: u32) -> Result<Self, ScheduleError> {
        if end_minute > MINUTES_PER_DAY || start_minute >= end_minute {
            return Err(ScheduleError::InvalidLabel(format!(
                "{} - {}",
                format_minute(start_minute),
                format_minute(end_minute)
            )));
        }

        Ok(Self { start_minute, end_minute })
    }

    pub fn start_minute(&self) -> u32 {
        self.start_minute
    }

    pub fn end_minute(&self) -> u32 {
        self.end_minute
    }
}

impl FromStr for SlotLabel {
    type Err = ScheduleError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidLabel(label.to_string());

        let (start, end) = label.split_once('-').ok_or_else(invalid)?;
        let start = parse_clock_time(start.trim()).ok_or_else(invalid)?;
        let end = parse_clock_time(end.trim()).ok_or_else(invalid)?;

        let start_minute = minute_of_day(start);
        let end_minute = match minute_of_day(end) {
            0 => MINUTES_PER_DAY,
            minute => minute,
        };

        Self::from_minutes(start_minute, end_minute).map_err(|_| invalid())
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_minute(self.start_minute),
            format_minute(self.end_minute)
        )
    }
}

impl Serialize for SlotLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid slot label: {0:?} (expected \"HH:MM - HH:MM\")")]
    InvalidLabel(String),

    #[error("Invalid schedule configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Time {0} cannot be represented in the schedule timezone")]
    UnrepresentableTime(String),
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn format_minute(minute: u32) -> String {
    let minute = minute % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Accepts both `YYYY-MM-DD` and full ISO-8601 timestamps.
fn deserialize_dates<'de, D>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    raw.iter()
        .map(|value| {
            let day = value.get(..10).unwrap_or(value.as_str());
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map_err(|e| serde::de::Error::custom(format!("invalid date {:?}: {}", value, e)))
        })
        .collect()
}

mod weekday_name {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        let name = match day {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        };
        serializer.serialize_str(name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .parse::<Weekday>()
            .map_err(|_| serde::de::Error::custom(format!("unknown weekday {:?}", raw)))
    }
}

mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock_time(raw.trim())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time {:?}", raw)))
    }
}

// libs/provider-cell/src/services/schedule.rs
use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{Provider, ScheduleError, Slot, SlotLabel, MINUTES_PER_DAY};

/// Turns a provider's weekly template into concrete slots and converts slot
/// labels to and from UTC instants.
///
/// Labels are wall-clock times at a fixed UTC offset (the schedule timezone).
#[derive(Debug, Clone, Copy)]
pub struct SlotPlanner {
    slot_minutes: u32,
    offset: FixedOffset,
}

impl SlotPlanner {
    pub fn new(slot_minutes: u32, offset: FixedOffset) -> Result<Self, ScheduleError> {
        if slot_minutes == 0 || slot_minutes > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "slot duration must be between 1 and {} minutes, got {}",
                MINUTES_PER_DAY, slot_minutes
            )));
        }

        Ok(Self { slot_minutes, offset })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ScheduleError> {
        let offset = config
            .schedule_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ScheduleError::InvalidConfiguration(format!(
                    "schedule UTC offset of {} minutes is out of range",
                    config.schedule_utc_offset_minutes
                ))
            })?;

        let slot_minutes = u32::try_from(config.slot_duration_minutes).map_err(|_| {
            ScheduleError::InvalidConfiguration(format!(
                "slot duration must be positive, got {}",
                config.slot_duration_minutes
            ))
        })?;

        Self::new(slot_minutes, offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Slot labels the provider offers on `date`, earliest first.
    ///
    /// Each weekly window is cut into back-to-back slots; a trailing remainder
    /// shorter than one slot is dropped. Unavailable dates offer nothing.
    pub fn labels_for(&self, provider: &Provider, date: NaiveDate) -> Vec<SlotLabel> {
        if provider.is_unavailable_on(date) {
            debug!("Provider {} is unavailable on {}", provider.id, date);
            return Vec::new();
        }

        let mut labels = BTreeSet::new();

        for window in provider.windows_for(date.weekday()) {
            let mut cursor = window.start_minute();
            let end = window.end_minute();

            while cursor + self.slot_minutes <= end {
                if let Ok(label) = SlotLabel::from_minutes(cursor, cursor + self.slot_minutes) {
                    labels.insert(label);
                }
                cursor += self.slot_minutes;
            }
        }

        labels.into_iter().collect()
    }

    /// Slots for `date`, flagged booked when an occupying range matches exactly.
    pub fn day_slots(
        &self,
        provider: &Provider,
        date: NaiveDate,
        occupied: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> Vec<Slot> {
        self.labels_for(provider, date)
            .into_iter()
            .filter_map(|label| {
                let range = self.label_range(date, &label).ok()?;
                Some(Slot {
                    time: label.to_string(),
                    is_booked: occupied.contains(&range),
                })
            })
            .collect()
    }

    /// UTC start and end of `label` on `date`.
    pub fn label_range(
        &self,
        date: NaiveDate,
        label: &SlotLabel,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ScheduleError> {
        let start = self.instant_at(date, label.start_minute())?;
        let end = self.instant_at(date, label.end_minute())?;
        Ok((start, end))
    }

    /// Local date and label of a UTC range, the inverse of [`Self::label_range`].
    pub fn label_for(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(NaiveDate, SlotLabel), ScheduleError> {
        let local_start = start.with_timezone(&self.offset);
        let date = local_start.date_naive();

        let start_minute = minute_of(local_start.time());
        let span = (end - start).num_minutes();
        let end_minute = i64::from(start_minute) + span;

        let end_minute = u32::try_from(end_minute)
            .map_err(|_| ScheduleError::UnrepresentableTime(end.to_rfc3339()))?;

        let label = SlotLabel::from_minutes(start_minute, end_minute)
            .map_err(|_| ScheduleError::UnrepresentableTime(format!("{} - {}", start, end)))?;

        Ok((date, label))
    }

    fn instant_at(&self, date: NaiveDate, minute: u32) -> Result<DateTime<Utc>, ScheduleError> {
        let unrepresentable = || ScheduleError::UnrepresentableTime(format!("{} 00:00", date));

        let local_midnight = date.and_hms_opt(0, 0, 0).ok_or_else(unrepresentable)?;
        let midnight = self
            .offset
            .from_local_datetime(&local_midnight)
            .single()
            .ok_or_else(unrepresentable)?;

        Ok((midnight + Duration::minutes(i64::from(minute))).with_timezone(&Utc))
    }
}

fn minute_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

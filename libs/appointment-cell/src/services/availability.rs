// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use provider_cell::{SlotLabel, SlotPlanner};
use shared_utils::Clock;

use crate::error::AppointmentError;
use crate::models::ResolvedSlot;
use crate::state::AppState;
use crate::store::AppointmentStore;

/// Resolves a provider's slots for a date into concrete, selectable ranges.
pub struct SlotAvailabilityService {
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    planner: SlotPlanner,
}

impl SlotAvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            clock: Arc::clone(&state.clock),
            planner: state.planner,
        }
    }

    /// Slots offered on `date`, earliest first. A slot that has already
    /// started is never selectable, booked or not.
    pub async fn resolve_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<ResolvedSlot>, AppointmentError> {
        debug!("Resolving slots for provider {} on {}", provider_id, date);

        let slots = self.store.provider_slots(provider_id, date, auth_token).await?;
        let now = self.clock.now();

        let mut resolved: Vec<ResolvedSlot> = slots
            .into_iter()
            .filter_map(|slot| {
                let label = match slot.time.parse::<SlotLabel>() {
                    Ok(label) => label,
                    Err(e) => {
                        warn!("Skipping slot from provider {}: {}", provider_id, e);
                        return None;
                    }
                };

                let (start, end) = match self.planner.label_range(date, &label) {
                    Ok(range) => range,
                    Err(e) => {
                        warn!("Skipping slot {} on {}: {}", label, date, e);
                        return None;
                    }
                };

                let is_past = start <= now;
                Some(ResolvedSlot {
                    time: label,
                    is_booked: slot.is_booked,
                    start,
                    end,
                    is_past,
                    selectable: !is_past && !slot.is_booked,
                })
            })
            .collect();

        resolved.sort_by_key(|slot| (slot.start, slot.time));
        resolved.dedup_by_key(|slot| slot.time);

        debug!("Resolved {} slots for provider {} on {}", resolved.len(), provider_id, date);
        Ok(resolved)
    }

    pub async fn find_slot(
        &self,
        provider_id: &str,
        date: NaiveDate,
        label: &SlotLabel,
        auth_token: &str,
    ) -> Result<ResolvedSlot, AppointmentError> {
        self.resolve_slots(provider_id, date, auth_token)
            .await?
            .into_iter()
            .find(|slot| slot.time == *label)
            .ok_or_else(|| {
                AppointmentError::Validation(format!(
                    "Provider {} does not offer slot {} on {}",
                    provider_id, label, date
                ))
            })
    }
}

// libs/appointment-cell/src/store/memory.rs
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use provider_cell::{Provider, ScheduleError, Slot, SlotPlanner};
use shared_config::AppConfig;
use shared_utils::Clock;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentAction, RescheduleCommand};
use crate::store::AppointmentStore;

/// A slot handed back through `unlock_slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedSlot {
    pub provider_id: String,
    pub date: NaiveDate,
    pub slot_time: String,
}

#[derive(Default)]
struct StoreState {
    appointments: BTreeMap<String, Appointment>,
    providers: HashMap<String, Provider>,
    released: Vec<ReleasedSlot>,
}

/// In-process arbiter with the same write semantics as the booking API.
///
/// All checks and writes happen under one lock, so of two writers racing for
/// the same slot exactly one wins. Tokens are accepted but not checked.
pub struct InMemoryAppointmentStore {
    planner: SlotPlanner,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

impl InMemoryAppointmentStore {
    pub fn new(planner: SlotPlanner, clock: Arc<dyn Clock>) -> Self {
        Self {
            planner,
            clock,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ScheduleError> {
        Ok(Self::new(SlotPlanner::from_config(config)?, clock))
    }

    pub async fn insert_provider(&self, provider: Provider) {
        let mut state = self.state.lock().await;
        state.providers.insert(provider.id.clone(), provider);
    }

    pub async fn insert_appointment(&self, appointment: Appointment) {
        let mut state = self.state.lock().await;
        state.appointments.insert(appointment.id.clone(), appointment);
    }

    pub async fn released_slots(&self) -> Vec<ReleasedSlot> {
        self.state.lock().await.released.clone()
    }

    async fn apply(&self, appointment_id: &str, action: AppointmentAction) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let appointment = state
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))?;

        if !action.is_allowed_from(appointment.status) {
            warn!("Store refused {} on appointment {} ({})", action, appointment_id, appointment.status);
            return Err(AppointmentError::InvalidTransition {
                action,
                status: appointment.status,
            });
        }

        appointment.status = action.target();
        appointment.updated_at = Some(now);

        info!("Appointment {} is now {}", appointment_id, appointment.status);
        Ok(appointment.clone())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn list_appointments(&self, _auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.state.lock().await.appointments.values().cloned().collect())
    }

    async fn get_appointment(&self, appointment_id: &str, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.state
            .lock()
            .await
            .appointments
            .get(appointment_id)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    async fn approve(&self, appointment_id: &str, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.apply(appointment_id, AppointmentAction::Approve).await
    }

    async fn reject(&self, appointment_id: &str, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.apply(appointment_id, AppointmentAction::Reject).await
    }

    async fn cancel(&self, appointment_id: &str, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.apply(appointment_id, AppointmentAction::Cancel).await
    }

    async fn reschedule(
        &self,
        appointment_id: &str,
        command: &RescheduleCommand,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let current = state
            .appointments
            .get(appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))?;

        if !AppointmentAction::Reschedule.is_allowed_from(current.status) {
            return Err(AppointmentError::InvalidTransition {
                action: AppointmentAction::Reschedule,
                status: current.status,
            });
        }

        let provider_id = current.provider_id().to_string();
        let taken = state.appointments.values().any(|other| {
            other.id != appointment_id
                && other.provider_id() == provider_id
                && other.occupies_slot()
                && other.overlaps(command.start, command.end)
        });

        if taken {
            warn!(
                "Reschedule of {} lost the race for {} - {}",
                appointment_id, command.start, command.end
            );
            return Err(AppointmentError::Conflict(
                "The selected slot was booked by another appointment".to_string(),
            ));
        }

        let appointment = state
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))?;

        appointment.start = command.start;
        appointment.end = command.end;
        if let Some(status) = command.status {
            appointment.status = status;
        }
        appointment.updated_at = Some(now);

        info!("Appointment {} moved to {} - {}", appointment_id, command.start, command.end);
        Ok(appointment.clone())
    }

    async fn provider_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let state = self.state.lock().await;

        let provider = state
            .providers
            .get(provider_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("provider {}", provider_id)))?;

        let occupied: Vec<_> = state
            .appointments
            .values()
            .filter(|appointment| appointment.provider_id() == provider_id && appointment.occupies_slot())
            .map(|appointment| (appointment.start, appointment.end))
            .collect();

        let slots = self.planner.day_slots(provider, date, &occupied);
        debug!("Derived {} slots for provider {} on {}", slots.len(), provider_id, date);

        Ok(slots)
    }

    async fn unlock_slot(
        &self,
        provider_id: &str,
        date: NaiveDate,
        slot_time: &str,
        _auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let mut state = self.state.lock().await;

        if !state.providers.contains_key(provider_id) {
            return Err(AppointmentError::NotFound(format!("provider {}", provider_id)));
        }

        state.released.push(ReleasedSlot {
            provider_id: provider_id.to_string(),
            date,
            slot_time: slot_time.to_string(),
        });

        Ok(())
    }
}

// libs/appointment-cell/src/services/status.rs
use std::sync::Arc;

use tracing::{debug, info, warn};

use provider_cell::SlotPlanner;
use shared_utils::Clock;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFilter, AppointmentView};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::state::AppState;
use crate::store::AppointmentStore;

/// Reads appointments and applies approve, reject and cancel after the
/// state machine has cleared them.
pub struct AppointmentStatusService {
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    lifecycle: AppointmentLifecycleService,
    planner: SlotPlanner,
}

impl AppointmentStatusService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            clock: Arc::clone(&state.clock),
            lifecycle: AppointmentLifecycleService::new(state.rules),
            planner: state.planner,
        }
    }

    pub async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;
        Ok(self.lifecycle.view(appointment, self.clock.now()))
    }

    /// Appointments matching `filter`, earliest start first.
    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        debug!("Listing appointments with filter {:?}", filter);

        let now = self.clock.now();
        let mut views: Vec<AppointmentView> = self
            .store
            .list_appointments(auth_token)
            .await?
            .into_iter()
            .map(|appointment| self.lifecycle.view(appointment, now))
            .filter(|view| self.matches(view, filter))
            .collect();

        views.sort_by_key(|view| view.appointment.start);
        Ok(views)
    }

    pub async fn approve(&self, appointment_id: &str, auth_token: &str) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_approve(&appointment, self.clock.now())?;

        let approved = self.store.approve(appointment_id, auth_token).await?;
        info!("Approved appointment {}", appointment_id);

        Ok(self.lifecycle.view(approved, self.clock.now()))
    }

    /// Rejects the appointment, then hands its slot back to the provider.
    /// A failed release is logged; the rejection stands.
    pub async fn reject(&self, appointment_id: &str, auth_token: &str) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_reject(&appointment, self.clock.now())?;

        let rejected = self.store.reject(appointment_id, auth_token).await?;
        info!("Rejected appointment {}", appointment_id);

        self.release_slot(&appointment, auth_token).await;

        Ok(self.lifecycle.view(rejected, self.clock.now()))
    }

    pub async fn cancel(&self, appointment_id: &str, auth_token: &str) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_cancel(&appointment, self.clock.now())?;

        let cancelled = self.store.cancel(appointment_id, auth_token).await?;
        info!("Cancelled appointment {}", appointment_id);

        Ok(self.lifecycle.view(cancelled, self.clock.now()))
    }

    async fn release_slot(&self, appointment: &Appointment, auth_token: &str) {
        let (date, label) = match self.planner.label_for(appointment.start, appointment.end) {
            Ok(slot) => slot,
            Err(e) => {
                warn!("Appointment {} has no slot label to release: {}", appointment.id, e);
                return;
            }
        };

        if let Err(e) = self
            .store
            .unlock_slot(appointment.provider_id(), date, &label.to_string(), auth_token)
            .await
        {
            warn!("Failed to release slot {} on {} for appointment {}: {}", label, date, appointment.id, e);
        }
    }

    fn matches(&self, view: &AppointmentView, filter: &AppointmentFilter) -> bool {
        if let Some(provider) = filter.provider.as_deref() {
            let reference = &view.appointment.provider;
            let by_id = reference.id() == provider;
            let by_name = reference
                .name()
                .map(|name| name.eq_ignore_ascii_case(provider))
                .unwrap_or(false);
            if !by_id && !by_name {
                return false;
            }
        }

        if let Some(status) = filter.status {
            if view.effective_status != status {
                return false;
            }
        }

        if let Some(date) = filter.date {
            let local_date = view
                .appointment
                .start
                .with_timezone(&self.planner.offset())
                .date_naive();
            if local_date != date {
                return false;
            }
        }

        true
    }
}

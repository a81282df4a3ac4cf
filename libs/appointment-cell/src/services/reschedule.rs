// libs/appointment-cell/src/services/reschedule.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use provider_cell::{SlotLabel, SlotPlanner};
use shared_utils::Clock;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentAction, AppointmentStatus, ConfirmedReschedule, RescheduleCommand,
    RescheduleProposal, RescheduleRequest,
};
use crate::services::availability::SlotAvailabilityService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::state::AppState;
use crate::store::AppointmentStore;

/// Moves an appointment into another slot in two steps: `propose` validates
/// and `commit` writes. Only a [`ConfirmedReschedule`] can be committed.
pub struct ReschedulingCoordinator {
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    lifecycle: AppointmentLifecycleService,
    availability: SlotAvailabilityService,
    planner: SlotPlanner,
}

impl ReschedulingCoordinator {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            clock: Arc::clone(&state.clock),
            lifecycle: AppointmentLifecycleService::new(state.rules),
            availability: SlotAvailabilityService::new(state),
            planner: state.planner,
        }
    }

    #[instrument(skip(self, auth_token), fields(provider_id = %request.provider_id, slot = %request.slot))]
    pub async fn propose(
        &self,
        appointment_id: &str,
        request: &RescheduleRequest,
        auth_token: &str,
    ) -> Result<RescheduleProposal, AppointmentError> {
        let label: SlotLabel = request.slot.parse()?;
        let (new_start, new_end) = self.planner.label_range(request.date, &label)?;

        // Timing is checked before anything is fetched.
        self.lifecycle
            .validate_reschedule_window(new_start, new_end, self.clock.now())?;

        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle
            .validate_reschedule_status(&appointment, self.clock.now())?;

        if appointment.provider_id() != request.provider_id {
            return Err(AppointmentError::Validation(format!(
                "Appointment {} belongs to provider {}, not {}",
                appointment.id,
                appointment.provider_id(),
                request.provider_id
            )));
        }

        if appointment.start == new_start && appointment.end == new_end {
            return Err(AppointmentError::Validation(format!(
                "Appointment {} already occupies slot {}",
                appointment.id, label
            )));
        }

        let slot = self
            .availability
            .find_slot(&request.provider_id, request.date, &label, auth_token)
            .await?;

        if slot.is_past {
            return Err(AppointmentError::RescheduleTooSoon {
                earliest: self.clock.now() + self.lifecycle.rules().reschedule_min_lead,
            });
        }

        if slot.is_booked {
            warn!("Slot {} on {} is already booked", label, request.date);
            return Err(AppointmentError::SlotBooked(label.to_string()));
        }

        debug!("Reschedule of {} to {} validated", appointment.id, label);

        Ok(RescheduleProposal {
            resulting_status: AppointmentAction::Reschedule.target(),
            appointment,
            date: request.date,
            slot,
        })
    }

    /// Writes a confirmed proposal. Timing is re-checked against a fresh
    /// "now"; the store decides any race for the slot.
    #[instrument(skip(self, confirmed, auth_token), fields(appointment_id = %confirmed.proposal().appointment.id))]
    pub async fn commit(
        &self,
        confirmed: ConfirmedReschedule,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let proposal = confirmed.into_proposal();
        let (new_start, new_end) = (proposal.new_start(), proposal.new_end());

        self.lifecycle
            .validate_reschedule_window(new_start, new_end, self.clock.now())?;

        let command = RescheduleCommand {
            start: new_start,
            end: new_end,
            status: (proposal.appointment.status == AppointmentStatus::Missed)
                .then_some(proposal.resulting_status),
        };

        let appointment = self
            .store
            .reschedule(&proposal.appointment.id, &command, auth_token)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    warn!("Reschedule of {} lost its slot: {}", proposal.appointment.id, e);
                }
                e
            })?;

        info!(
            "Rescheduled appointment {} to {} on {}",
            appointment.id, proposal.slot.time, proposal.date
        );
        Ok(appointment)
    }

    /// Propose, ask `confirm`, and commit only on an explicit yes.
    pub async fn reschedule<F>(
        &self,
        appointment_id: &str,
        request: &RescheduleRequest,
        auth_token: &str,
        confirm: F,
    ) -> Result<Appointment, AppointmentError>
    where
        F: FnOnce(&RescheduleProposal) -> bool,
    {
        let proposal = self.propose(appointment_id, request, auth_token).await?;

        if !confirm(&proposal) {
            debug!("Reschedule of {} was not confirmed", appointment_id);
            return Err(AppointmentError::ConfirmationRequired(
                "Reschedule was not confirmed".to_string(),
            ));
        }

        self.commit(proposal.confirm(), auth_token).await
    }
}

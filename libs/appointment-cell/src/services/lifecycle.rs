// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use provider_cell::ScheduleError;
use shared_config::AppConfig;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentAction, AppointmentStatus, AppointmentView};

#[derive(Debug, Clone, Copy)]
pub struct LifecycleRules {
    /// How long after its start a pending appointment may still be approved.
    pub approval_grace: Duration,
    /// Minimum distance between "now" and a rescheduled start.
    pub reschedule_min_lead: Duration,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            approval_grace: Duration::minutes(15),
            reschedule_min_lead: Duration::minutes(30),
        }
    }
}

impl LifecycleRules {
    pub fn from_config(config: &AppConfig) -> Result<Self, ScheduleError> {
        Ok(Self {
            approval_grace: config_minutes("approval grace", config.approval_grace_minutes)?,
            reschedule_min_lead: config_minutes(
                "reschedule minimum lead",
                config.reschedule_min_lead_minutes,
            )?,
        })
    }
}

fn config_minutes(name: &str, minutes: i64) -> Result<Duration, ScheduleError> {
    if minutes < 0 {
        return Err(ScheduleError::InvalidConfiguration(format!(
            "{} must not be negative, got {} minutes",
            name, minutes
        )));
    }

    Duration::try_minutes(minutes).ok_or_else(|| {
        ScheduleError::InvalidConfiguration(format!("{} of {} minutes is out of range", name, minutes))
    })
}

/// The appointment state machine. Pure: every check takes "now" explicitly.
#[derive(Debug, Clone, Default)]
pub struct AppointmentLifecycleService {
    rules: LifecycleRules,
}

impl AppointmentLifecycleService {
    pub fn new(rules: LifecycleRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &LifecycleRules {
        &self.rules
    }

    /// A pending appointment whose start has passed reads as missed.
    pub fn effective_status(&self, appointment: &Appointment, now: DateTime<Utc>) -> AppointmentStatus {
        match appointment.status {
            AppointmentStatus::Pending if now > appointment.start => AppointmentStatus::Missed,
            status => status,
        }
    }

    pub fn validate_approve(&self, appointment: &Appointment, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        debug!("Validating approve for appointment {}", appointment.id);

        self.require_status(appointment, AppointmentAction::Approve, now)?;

        // Stored status is still pending here, so the grace window applies even
        // when the appointment already reads as missed.
        let deadline = appointment.start + self.rules.approval_grace;
        if now > deadline {
            warn!("Approval of {} refused: window closed at {}", appointment.id, deadline);
            return Err(AppointmentError::ApprovalWindowClosed { deadline });
        }

        Ok(())
    }

    pub fn validate_reject(&self, appointment: &Appointment, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        self.require_status(appointment, AppointmentAction::Reject, now)
    }

    pub fn validate_cancel(&self, appointment: &Appointment, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        self.require_status(appointment, AppointmentAction::Cancel, now)
    }

    pub fn validate_reschedule_status(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        self.require_status(appointment, AppointmentAction::Reschedule, now)
    }

    /// Timing rules for a new range. Needs no appointment, so it runs before
    /// anything is fetched.
    pub fn validate_reschedule_window(
        &self,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if new_end <= new_start {
            return Err(AppointmentError::Validation(format!(
                "New end {} must be after new start {}",
                new_end, new_start
            )));
        }

        let earliest = now + self.rules.reschedule_min_lead;
        if new_start < earliest || new_start <= now {
            warn!("Reschedule to {} refused: earliest allowed start is {}", new_start, earliest);
            return Err(AppointmentError::RescheduleTooSoon { earliest });
        }

        Ok(())
    }

    /// Actions whose guards pass right now. Reschedule is listed on status
    /// alone; its timing depends on the slot picked later.
    pub fn available_actions(&self, appointment: &Appointment, now: DateTime<Utc>) -> Vec<AppointmentAction> {
        AppointmentAction::ALL
            .into_iter()
            .filter(|action| match action {
                AppointmentAction::Approve => self.validate_approve(appointment, now).is_ok(),
                action => action.is_allowed_from(appointment.status),
            })
            .collect()
    }

    pub fn view(&self, appointment: Appointment, now: DateTime<Utc>) -> AppointmentView {
        AppointmentView {
            effective_status: self.effective_status(&appointment, now),
            available_actions: self.available_actions(&appointment, now),
            appointment,
        }
    }

    fn require_status(
        &self,
        appointment: &Appointment,
        action: AppointmentAction,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if action.is_allowed_from(appointment.status) {
            return Ok(());
        }

        let status = self.effective_status(appointment, now);
        warn!("Invalid transition attempted: {} on {} appointment {}", action, status, appointment.id);
        Err(AppointmentError::InvalidTransition { action, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParticipantRef;
    use chrono::TimeZone;

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "appt-1".to_string(),
            user: None,
            provider: ParticipantRef::Id("prov-1".to_string()),
            start: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn pending_reads_as_missed_once_start_passes() {
        let service = AppointmentLifecycleService::default();
        let appt = appointment(AppointmentStatus::Pending);

        assert_eq!(service.effective_status(&appt, appt.start), AppointmentStatus::Pending);
        assert_eq!(
            service.effective_status(&appt, appt.start + Duration::seconds(1)),
            AppointmentStatus::Missed
        );
    }
}

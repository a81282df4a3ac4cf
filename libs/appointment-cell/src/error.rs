use chrono::{DateTime, Utc};
use thiserror::Error;

use provider_cell::ScheduleError;
use shared_database::ApiClientError;
use shared_models::error::AppError;

use crate::models::{AppointmentAction, AppointmentStatus};

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot {action} an appointment that is {status}")]
    InvalidTransition {
        action: AppointmentAction,
        status: AppointmentStatus,
    },

    #[error("Approval window closed at {deadline}")]
    ApprovalWindowClosed { deadline: DateTime<Utc> },

    #[error("New start must be at or after {earliest}")]
    RescheduleTooSoon { earliest: DateTime<Utc> },

    #[error("Slot {0} is already booked")]
    SlotBooked(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Booking API unreachable: {0}")]
    Transport(String),

    #[error("Booking API error: {0}")]
    Remote(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppointmentError {
    /// True when a competing write won the slot or changed the appointment.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppointmentError::SlotBooked(_) | AppointmentError::Conflict(_))
    }

    /// True for time-window and status guard violations.
    pub fn is_guard_violation(&self) -> bool {
        matches!(
            self,
            AppointmentError::InvalidTransition { .. }
                | AppointmentError::ApprovalWindowClosed { .. }
                | AppointmentError::RescheduleTooSoon { .. }
        )
    }
}

impl From<ApiClientError> for AppointmentError {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::Unauthorized(msg) => AppointmentError::Unauthorized(msg),
            ApiClientError::NotFound(msg) => AppointmentError::NotFound(msg),
            ApiClientError::Conflict(msg) => AppointmentError::Conflict(msg),
            ApiClientError::Rejected { message, .. } => AppointmentError::Validation(message),
            ApiClientError::Api { status, message } => {
                AppointmentError::Remote(format!("{} ({})", message, status))
            }
            ApiClientError::Transport(msg) => AppointmentError::Transport(msg),
            ApiClientError::Decode(msg) => {
                AppointmentError::Remote(format!("unexpected response: {}", msg))
            }
            ApiClientError::Configuration(msg) => AppointmentError::Internal(msg),
        }
    }
}

impl From<ScheduleError> for AppointmentError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidConfiguration(_) => AppointmentError::Internal(err.to_string()),
            ScheduleError::InvalidLabel(_) | ScheduleError::UnrepresentableTime(_) => {
                AppointmentError::Validation(err.to_string())
            }
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            err if err.is_guard_violation() => AppError::RuleViolation(message),
            err if err.is_conflict() => AppError::Conflict(message),
            AppointmentError::NotFound(_) => AppError::NotFound(message),
            AppointmentError::Validation(_) => AppError::ValidationError(message),
            AppointmentError::ConfirmationRequired(_) => AppError::ConfirmationRequired(message),
            AppointmentError::Unauthorized(_) => AppError::Auth(message),
            AppointmentError::Transport(_) | AppointmentError::Remote(_) => {
                AppError::ExternalService(message)
            }
            _ => AppError::Internal(message),
        }
    }
}

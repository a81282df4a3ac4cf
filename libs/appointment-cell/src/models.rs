// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::value::StringDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

use provider_cell::SlotLabel;

// ==============================================================================
// PARTICIPANTS
// ==============================================================================

/// Reference to a user or provider. The booking API sends either a bare id or
/// an embedded summary, depending on whether the endpoint populates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParticipantRef {
    Id(String),
    Summary(ParticipantSummary),
}

impl ParticipantRef {
    pub fn id(&self) -> &str {
        match self {
            ParticipantRef::Id(id) => id,
            ParticipantRef::Summary(summary) => &summary.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ParticipantRef::Id(_) => None,
            ParticipantRef::Summary(summary) => summary.name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "userId", alias = "user", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ParticipantRef>,
    #[serde(rename = "providerId", alias = "provider")]
    pub provider: ParticipantRef,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Whether this appointment holds its slot against other bookings.
    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Missed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Missed => "missed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentAction {
    Approve,
    Reject,
    Reschedule,
    Cancel,
}

impl AppointmentAction {
    pub const ALL: [AppointmentAction; 4] = [
        AppointmentAction::Approve,
        AppointmentAction::Reject,
        AppointmentAction::Reschedule,
        AppointmentAction::Cancel,
    ];

    /// Stored statuses from which the action may be taken.
    pub fn allowed_from(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentAction::Approve => &[AppointmentStatus::Pending],
            AppointmentAction::Reject => &[AppointmentStatus::Pending, AppointmentStatus::Missed],
            AppointmentAction::Reschedule => &[AppointmentStatus::Pending, AppointmentStatus::Missed],
            AppointmentAction::Cancel => &[
                AppointmentStatus::Pending,
                AppointmentStatus::Approved,
                AppointmentStatus::Missed,
            ],
        }
    }

    pub fn is_allowed_from(&self, status: AppointmentStatus) -> bool {
        self.allowed_from().contains(&status)
    }

    /// Status the appointment is stored with once the action commits.
    /// A rescheduled appointment is pending again, whether it was missed or not.
    pub fn target(&self) -> AppointmentStatus {
        match self {
            AppointmentAction::Approve => AppointmentStatus::Approved,
            AppointmentAction::Reject => AppointmentStatus::Rejected,
            AppointmentAction::Reschedule => AppointmentStatus::Pending,
            AppointmentAction::Cancel => AppointmentStatus::Cancelled,
        }
    }
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentAction::Approve => "approve",
            AppointmentAction::Reject => "reject",
            AppointmentAction::Reschedule => "reschedule",
            AppointmentAction::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// Write sent to the store when a reschedule commits.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RescheduleCommand {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

/// Appointment as the dashboard sees it: stored fields plus the status and
/// buttons that apply right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub effective_status: AppointmentStatus,
    pub available_actions: Vec<AppointmentAction>,
}

/// Dashboard list filter. The dashboard sends `""` for "All", so blank
/// values count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    /// Provider id or display name.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date: Option<NaiveDate>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StringDeserializer<D::Error> = value.to_owned().into_deserializer();
            T::deserialize(value).map(Some)
        }
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlot {
    pub time: SlotLabel,
    pub is_booked: bool,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_past: bool,
    pub selectable: bool,
}

// ==============================================================================
// RESCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub provider_id: String,
    pub date: NaiveDate,
    pub slot: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRescheduleRequest {
    #[serde(flatten)]
    pub request: RescheduleRequest,
    /// Start of the appointment as shown in the preview.
    pub expected_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confirm: bool,
}

/// A validated reschedule waiting for the operator's acknowledgment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleProposal {
    pub appointment: Appointment,
    pub date: NaiveDate,
    pub slot: ResolvedSlot,
    pub resulting_status: AppointmentStatus,
}

impl RescheduleProposal {
    pub fn new_start(&self) -> DateTime<Utc> {
        self.slot.start
    }

    pub fn new_end(&self) -> DateTime<Utc> {
        self.slot.end
    }

    /// The explicit second acknowledgment. Only a confirmed proposal can be committed.
    pub fn confirm(self) -> ConfirmedReschedule {
        ConfirmedReschedule { proposal: self }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmedReschedule {
    proposal: RescheduleProposal,
}

impl ConfirmedReschedule {
    pub fn proposal(&self) -> &RescheduleProposal {
        &self.proposal
    }

    pub fn into_proposal(self) -> RescheduleProposal {
        self.proposal
    }
}

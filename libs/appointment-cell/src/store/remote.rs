// libs/appointment-cell/src/store/remote.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use provider_cell::Slot;
use shared_database::{ApiClientError, BookingApiClient};

use crate::error::AppointmentError;
use crate::models::{Appointment, RescheduleCommand};
use crate::store::AppointmentStore;

// The booking API wraps some payloads and not others.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppointmentList {
    Wrapped { appointments: Vec<Appointment> },
    Bare(Vec<Appointment>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SingleAppointment {
    Wrapped { appointment: Appointment },
    Bare(Appointment),
}

impl SingleAppointment {
    fn into_inner(self) -> Appointment {
        match self {
            SingleAppointment::Wrapped { appointment } | SingleAppointment::Bare(appointment) => appointment,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlotList {
    Wrapped { slots: Vec<Slot> },
    Bare(Vec<Slot>),
}

/// Store backed by the remote booking API. The API is the arbiter for every
/// write; this type only shapes requests and normalizes responses.
pub struct RemoteAppointmentStore {
    client: Arc<BookingApiClient>,
}

impl RemoteAppointmentStore {
    pub fn new(client: Arc<BookingApiClient>) -> Self {
        Self { client }
    }

    async fn transition(
        &self,
        appointment_id: &str,
        action: &str,
        body: Option<Value>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/appointments/{}/{}", urlencoding::encode(appointment_id), action);

        let response = self
            .client
            .request::<Value>(Method::PUT, &path, Some(auth_token), body)
            .await;

        match response {
            Ok(value) => match serde_json::from_value::<SingleAppointment>(value) {
                Ok(envelope) => {
                    info!("Booking API applied {} to appointment {}", action, appointment_id);
                    Ok(envelope.into_inner())
                }
                Err(e) => {
                    debug!("Response to {} carried no appointment ({}), re-fetching", action, e);
                    self.get_appointment(appointment_id, auth_token).await
                }
            },
            Err(ApiClientError::Decode(reason)) => {
                debug!("Response to {} was not JSON ({}), re-fetching", action, reason);
                self.get_appointment(appointment_id, auth_token).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl AppointmentStore for RemoteAppointmentStore {
    async fn list_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments from booking API");

        let list: AppointmentList = self
            .client
            .request(Method::GET, "/appointments", Some(auth_token), None)
            .await?;

        Ok(match list {
            AppointmentList::Wrapped { appointments } | AppointmentList::Bare(appointments) => appointments,
        })
    }

    async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/appointments/{}", urlencoding::encode(appointment_id));
        let appointment: SingleAppointment = self
            .client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointment.into_inner())
    }

    async fn approve(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, "approve", None, auth_token).await
    }

    async fn reject(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, "reject", None, auth_token).await
    }

    async fn cancel(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, "cancel", None, auth_token).await
    }

    async fn reschedule(
        &self,
        appointment_id: &str,
        command: &RescheduleCommand,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(command)
            .map_err(|e| AppointmentError::Internal(format!("Failed to encode reschedule: {}", e)))?;

        self.transition(appointment_id, "reschedule", Some(body), auth_token).await
    }

    async fn provider_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, AppointmentError> {
        debug!("Fetching slots for provider {} on {}", provider_id, date);

        let path = format!(
            "/providers/{}/slots?date={}",
            urlencoding::encode(provider_id),
            date.format("%Y-%m-%d")
        );

        let slots: SlotList = self
            .client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(match slots {
            SlotList::Wrapped { slots } | SlotList::Bare(slots) => slots,
        })
    }

    async fn unlock_slot(
        &self,
        provider_id: &str,
        date: NaiveDate,
        slot_time: &str,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/providers/{}/unlock-slot", urlencoding::encode(provider_id));
        let body = json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "slotTime": slot_time,
        });

        self.client
            .request_unit(Method::PUT, &path, Some(auth_token), Some(body))
            .await?;

        info!("Released slot {} on {} for provider {}", slot_time, date, provider_id);
        Ok(())
    }
}

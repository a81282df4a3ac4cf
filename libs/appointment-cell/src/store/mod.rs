use async_trait::async_trait;
use chrono::NaiveDate;

use provider_cell::Slot;

use crate::error::AppointmentError;
use crate::models::{Appointment, RescheduleCommand};

pub mod memory;
pub mod remote;

pub use memory::{InMemoryAppointmentStore, ReleasedSlot};
pub use remote::RemoteAppointmentStore;

/// Authoritative home of appointments and provider slots.
///
/// Every write is re-checked by the store itself: a status that changed or a
/// slot that was taken since it was read comes back as an error, never as a
/// silent overwrite. Tokens are forwarded for the store to authorize.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn approve(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn reject(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn cancel(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn reschedule(
        &self,
        appointment_id: &str,
        command: &RescheduleCommand,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn provider_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, AppointmentError>;

    async fn unlock_slot(
        &self,
        provider_id: &str,
        date: NaiveDate,
        slot_time: &str,
        auth_token: &str,
    ) -> Result<(), AppointmentError>;
}

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use appointment_cell::{AppState, Appointment, AppointmentStatus, InMemoryAppointmentStore, ParticipantRef};
use provider_cell::Provider;
use shared_utils::test_utils::{MockBookingResponses, TestConfig};
use shared_utils::FixedClock;

pub const PROVIDER_ID: &str = "prov-1";
pub const TOKEN: &str = "admin-token";

/// 2024-06-01 is a Saturday; the fixture provider works 09:00-17:00 then.
pub fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

pub fn appointment(id: &str, start_hour: u32, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.to_string(),
        user: Some(ParticipantRef::Id(format!("user-{}", id))),
        provider: ParticipantRef::Id(PROVIDER_ID.to_string()),
        start: at(start_hour, 0),
        end: at(start_hour + 1, 0),
        status,
        created_at: None,
        updated_at: None,
    }
}

pub fn provider() -> Provider {
    serde_json::from_value(MockBookingResponses::provider_response(PROVIDER_ID, "Dr. Test")).unwrap()
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<InMemoryAppointmentStore>,
    pub clock: FixedClock,
}

impl Harness {
    pub async fn new(now: DateTime<Utc>) -> Self {
        let config = TestConfig::default().to_arc();
        let clock = FixedClock::new(now);

        let store = Arc::new(InMemoryAppointmentStore::from_config(&config, Arc::new(clock.clone())).unwrap());
        store.insert_provider(provider()).await;

        let state = AppState::new(config, store.clone(), Arc::new(clock.clone())).unwrap();

        Self { state, store, clock }
    }

    pub async fn with_appointments(now: DateTime<Utc>, appointments: Vec<Appointment>) -> Self {
        let harness = Self::new(now).await;
        for appointment in appointments {
            harness.store.insert_appointment(appointment).await;
        }
        harness
    }
}

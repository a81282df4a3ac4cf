use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub booking_api_url: String,
    pub approval_grace_minutes: i64,
    pub reschedule_min_lead_minutes: i64,
    pub slot_duration_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            booking_api_url: "http://localhost:5000/api".to_string(),
            approval_grace_minutes: 15,
            reschedule_min_lead_minutes: 30,
            slot_duration_minutes: 60,
        }
    }
}

impl TestConfig {
    pub fn with_api_url(url: &str) -> Self {
        Self {
            booking_api_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            booking_api_url: self.booking_api_url.clone(),
            booking_api_timeout_secs: 5,
            approval_grace_minutes: self.approval_grace_minutes,
            reschedule_min_lead_minutes: self.reschedule_min_lead_minutes,
            slot_duration_minutes: self.slot_duration_minutes,
            schedule_utc_offset_minutes: 0,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Response bodies shaped like the booking API's documents.
pub struct MockBookingResponses;

impl MockBookingResponses {
    pub fn appointment_response(
        appointment_id: &str,
        provider_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "_id": appointment_id,
            "userId": {
                "_id": Uuid::new_v4().to_string(),
                "name": "Test User",
                "email": "user@example.com"
            },
            "providerId": {
                "_id": provider_id,
                "name": "Dr. Test"
            },
            "start": start.to_rfc3339(),
            "end": end.to_rfc3339(),
            "status": status,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    pub fn provider_response(provider_id: &str, name: &str) -> Value {
        json!({
            "_id": provider_id,
            "name": name,
            "speciality": "General Practice",
            "hourlyPrice": 50,
            "address": "1 Main Street",
            "city": "Springfield",
            "weeklyAvailability": [
                { "day": "Monday", "startTime": "09:00", "endTime": "12:00" },
                { "day": "Saturday", "startTime": "09:00", "endTime": "17:00" }
            ],
            "unavailableDates": []
        })
    }

    pub fn slot_response(time: &str, is_booked: bool) -> Value {
        json!({
            "time": time,
            "isBooked": is_booked
        })
    }
}

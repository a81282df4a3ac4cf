use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub booking_api_url: String,
    pub booking_api_timeout_secs: u64,
    pub approval_grace_minutes: i64,
    pub reschedule_min_lead_minutes: i64,
    pub slot_duration_minutes: i64,
    /// Offset of the wall clock that slot labels are written in.
    pub schedule_utc_offset_minutes: i32,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            booking_api_url: String::new(),
            booking_api_timeout_secs: 15,
            approval_grace_minutes: 15,
            reschedule_min_lead_minutes: 30,
            slot_duration_minutes: 60,
            schedule_utc_offset_minutes: 0,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            booking_api_url: env::var("BOOKING_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("BOOKING_API_URL not set, using empty value");
                    String::new()
                }),
            booking_api_timeout_secs: parse_var(
                "BOOKING_API_TIMEOUT_SECS",
                defaults.booking_api_timeout_secs,
            ),
            approval_grace_minutes: parse_var(
                "APPROVAL_GRACE_MINUTES",
                defaults.approval_grace_minutes,
            ),
            reschedule_min_lead_minutes: parse_var(
                "RESCHEDULE_MIN_LEAD_MINUTES",
                defaults.reschedule_min_lead_minutes,
            ),
            slot_duration_minutes: parse_var(
                "SLOT_DURATION_MINUTES",
                defaults.slot_duration_minutes,
            ),
            schedule_utc_offset_minutes: parse_var(
                "SCHEDULE_UTC_OFFSET_MINUTES",
                defaults.schedule_utc_offset_minutes,
            ),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| {
                warn!("BIND_ADDR not set, using default");
                defaults.bind_addr.clone()
            }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.booking_api_url.is_empty()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}

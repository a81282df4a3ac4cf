use std::sync::Arc;

use provider_cell::{ScheduleError, SlotPlanner};
use shared_config::AppConfig;
use shared_utils::Clock;

use crate::services::LifecycleRules;
use crate::store::AppointmentStore;

/// Everything a request needs; services are built from it per request.
/// Config-derived values are checked once here so a bad value stops startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn AppointmentStore>,
    pub clock: Arc<dyn Clock>,
    pub planner: SlotPlanner,
    pub rules: LifecycleRules,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ScheduleError> {
        let planner = SlotPlanner::from_config(&config)?;
        let rules = LifecycleRules::from_config(&config)?;

        Ok(Self {
            config,
            store,
            clock,
            planner,
            rules,
        })
    }
}

pub mod availability;
pub mod lifecycle;
pub mod reschedule;
pub mod status;

pub use availability::SlotAvailabilityService;
pub use lifecycle::{AppointmentLifecycleService, LifecycleRules};
pub use reschedule::ReschedulingCoordinator;
pub use status::AppointmentStatusService;

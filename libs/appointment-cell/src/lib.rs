pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod store;

// Re-export all models and services for external use
pub use error::AppointmentError;
pub use models::*;
pub use router::appointment_routes;
pub use services::*;
pub use state::AppState;
pub use store::{AppointmentStore, InMemoryAppointmentStore, RemoteAppointmentStore};

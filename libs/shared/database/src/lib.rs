pub mod booking_api;

pub use booking_api::{ApiClientError, BookingApiClient};

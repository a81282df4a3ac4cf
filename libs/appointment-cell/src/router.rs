// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::require_bearer;

use crate::handlers;
use crate::state::AppState;

pub fn appointment_routes(state: AppState) -> Router {
    // Every route acts on behalf of an admin, so all of them need the token
    let protected_routes = Router::new()
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/approve", put(handlers::approve_appointment))
        .route("/appointments/{appointment_id}/reject", put(handlers::reject_appointment))
        .route("/appointments/{appointment_id}/cancel", put(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/reschedule/preview", post(handlers::preview_reschedule))
        .route("/appointments/{appointment_id}/reschedule", put(handlers::confirm_reschedule))
        .route("/providers/{provider_id}/slots", get(handlers::get_provider_slots))
        .layer(middleware::from_fn(require_bearer));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

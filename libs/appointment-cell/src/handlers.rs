// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, FromRequest, FromRequestParts, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;
use shared_utils::extractor::AdminToken;

use crate::models::{AppointmentFilter, ConfirmRescheduleRequest, RescheduleRequest};
use crate::services::{
    AppointmentLifecycleService, AppointmentStatusService, ReschedulingCoordinator,
    SlotAvailabilityService,
};
use crate::state::AppState;

// ==============================================================================
// EXTRACTORS
// ==============================================================================

/// `Json` whose rejections render as `{ "error": ... }`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections render as `{ "error": ... }`.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(&state);
    let appointments = service.list_appointments(&filter, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(&state);
    let appointment = service.get_appointment(&appointment_id, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(&state);
    let appointment = service.approve(&appointment_id, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment approved"
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(&state);
    let appointment = service.reject(&appointment_id, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rejected"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(&state);
    let appointment = service.cancel(&appointment_id, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// RESCHEDULE HANDLERS
// ==============================================================================

/// First step of a reschedule: validate and show what would change.
#[axum::debug_handler]
pub async fn preview_reschedule(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
    ApiJson(request): ApiJson<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let coordinator = ReschedulingCoordinator::new(&state);
    let proposal = coordinator.propose(&appointment_id, &request, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "proposal": proposal,
        "message": "Confirm to move the appointment into this slot"
    })))
}

/// Second step: commits only with `confirm: true` and an unchanged appointment.
#[axum::debug_handler]
pub async fn confirm_reschedule(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(appointment_id): Path<String>,
    ApiJson(body): ApiJson<ConfirmRescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    if !body.confirm {
        return Err(AppError::ConfirmationRequired(
            "Reschedule must be confirmed with \"confirm\": true".to_string(),
        ));
    }

    let expected_start = body.expected_start.ok_or_else(|| {
        AppError::BadRequest("expectedStart from the preview is required".to_string())
    })?;

    let coordinator = ReschedulingCoordinator::new(&state);
    let proposal = coordinator
        .propose(&appointment_id, &body.request, token.as_str())
        .await?;

    if proposal.appointment.start != expected_start {
        warn!(
            "Appointment {} moved since preview ({} != {})",
            appointment_id, proposal.appointment.start, expected_start
        );
        return Err(AppError::Conflict(
            "Appointment changed since the preview; review it again".to_string(),
        ));
    }

    let appointment = coordinator.commit(proposal.confirm(), token.as_str()).await?;
    let view = AppointmentLifecycleService::new(state.rules).view(appointment, state.clock.now());

    Ok(Json(json!({
        "success": true,
        "appointment": view,
        "message": "Appointment rescheduled"
    })))
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_provider_slots(
    State(state): State<AppState>,
    Extension(token): Extension<AdminToken>,
    Path(provider_id): Path<String>,
    ApiQuery(query): ApiQuery<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SlotAvailabilityService::new(&state);
    let slots = service.resolve_slots(&provider_id, query.date, token.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "providerId": provider_id,
        "date": query.date,
        "slots": slots
    })))
}

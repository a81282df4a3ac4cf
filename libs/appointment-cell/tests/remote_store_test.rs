use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    AppState, AppointmentError, AppointmentStatus, AppointmentStore, RemoteAppointmentStore,
    RescheduleCommand, ReschedulingCoordinator, RescheduleRequest, SlotAvailabilityService,
};
use shared_database::BookingApiClient;
use shared_utils::test_utils::{MockBookingResponses, TestConfig};
use shared_utils::FixedClock;

mod common;
use common::{at, saturday, PROVIDER_ID, TOKEN};

fn remote_store(mock_server: &MockServer) -> RemoteAppointmentStore {
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();
    let client = BookingApiClient::new(&config).unwrap();
    RemoteAppointmentStore::new(Arc::new(client))
}

fn appointment_json(id: &str, start_hour: u32, status: &str) -> serde_json::Value {
    MockBookingResponses::appointment_response(id, PROVIDER_ID, at(start_hour, 0), at(start_hour + 1, 0), status)
}

#[tokio::test]
async fn test_list_accepts_wrapped_and_bare_payloads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appointments": [appointment_json("a", 10, "pending"), appointment_json("b", 11, "approved")]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json("c", 12, "missed")])))
        .mount(&mock_server)
        .await;

    let store = remote_store(&mock_server);

    let wrapped = store.list_appointments(TOKEN).await.unwrap();
    assert_eq!(wrapped.len(), 2);
    assert_eq!(wrapped[1].status, AppointmentStatus::Approved);
    assert_eq!(wrapped[0].provider_id(), PROVIDER_ID);
    assert_eq!(wrapped[0].user.as_ref().and_then(|u| u.name()), Some("Test User"));

    let bare = store.list_appointments(TOKEN).await.unwrap();
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0].status, AppointmentStatus::Missed);
}

#[tokio::test]
async fn test_get_unwraps_single_appointment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appointment": appointment_json("a", 10, "pending")
        })))
        .mount(&mock_server)
        .await;

    let appointment = remote_store(&mock_server).get_appointment("a", TOKEN).await.unwrap();

    assert_eq!(appointment.id, "a");
    assert_eq!(appointment.start, at(10, 0));
}

#[tokio::test]
async fn test_transition_without_appointment_body_refetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/appointments/a/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Appointment approved" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointment_json("a", 10, "approved")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointment = remote_store(&mock_server).approve("a", TOKEN).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Approved);
}

#[tokio::test]
async fn test_reschedule_sends_times_and_maps_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/appointments/a/reschedule"))
        .and(body_json(json!({
            "start": "2024-06-01T14:00:00Z",
            "end": "2024-06-01T15:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Slot already booked"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = RescheduleCommand { start: at(14, 0), end: at(15, 0), status: None };
    let result = remote_store(&mock_server).reschedule("a", &command, TOKEN).await;

    assert_matches!(result, Err(AppointmentError::Conflict(message)) if message == "Slot already booked");
}

#[tokio::test]
async fn test_reschedule_of_missed_carries_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/appointments/a/reschedule"))
        .and(body_json(json!({
            "start": "2024-06-01T14:00:00Z",
            "end": "2024-06-01T15:00:00Z",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointment_json("a", 14, "pending")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = RescheduleCommand {
        start: at(14, 0),
        end: at(15, 0),
        status: Some(AppointmentStatus::Pending),
    };
    let updated = remote_store(&mock_server).reschedule("a", &command, TOKEN).await.unwrap();

    assert_eq!(updated.start, at(14, 0));
}

#[tokio::test]
async fn test_provider_slots_query_by_date() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/slots", PROVIDER_ID)))
        .and(query_param("date", "2024-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBookingResponses::slot_response("09:00 - 10:00", false),
            MockBookingResponses::slot_response("10:00 - 11:00", true)
        ])))
        .mount(&mock_server)
        .await;

    let slots = remote_store(&mock_server)
        .provider_slots(PROVIDER_ID, saturday(), TOKEN)
        .await
        .unwrap();

    assert_eq!(slots.len(), 2);
    assert!(slots[1].is_booked);
}

#[tokio::test]
async fn test_unlock_slot_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/providers/{}/unlock-slot", PROVIDER_ID)))
        .and(body_json(json!({ "date": "2024-06-01", "slotTime": "10:00 - 11:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Slot unlocked" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    remote_store(&mock_server)
        .unlock_slot(PROVIDER_ID, saturday(), "10:00 - 11:00", TOKEN)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_statuses_are_mapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments/forbidden"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Appointment not found" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/appointments/done/reject"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Appointment already rejected" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let store = remote_store(&mock_server);

    assert_matches!(store.get_appointment("forbidden", TOKEN).await, Err(AppointmentError::Unauthorized(_)));
    assert_matches!(store.get_appointment("missing", TOKEN).await, Err(AppointmentError::NotFound(_)));
    assert_matches!(store.reject("done", TOKEN).await, Err(AppointmentError::Validation(_)));
    assert_matches!(store.get_appointment("broken", TOKEN).await, Err(AppointmentError::Remote(_)));
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    let config = TestConfig::with_api_url("http://127.0.0.1:9").to_app_config();
    let store = RemoteAppointmentStore::new(Arc::new(BookingApiClient::new(&config).unwrap()));

    assert_matches!(store.list_appointments(TOKEN).await, Err(AppointmentError::Transport(_)));
}

#[tokio::test]
async fn test_past_start_rejected_before_any_network_call() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_api_url(&mock_server.uri()).to_arc();
    let state = AppState::new(
        config,
        Arc::new(remote_store(&mock_server)),
        Arc::new(FixedClock::new(at(12, 0))),
    )
    .unwrap();
    let coordinator = ReschedulingCoordinator::new(&state);

    let request = RescheduleRequest {
        provider_id: PROVIDER_ID.to_string(),
        date: saturday(),
        slot: "10:00 - 11:00".to_string(),
    };

    assert_matches!(
        coordinator.propose("a", &request, TOKEN).await,
        Err(AppointmentError::RescheduleTooSoon { .. })
    );
}

#[tokio::test]
async fn test_resolved_remote_slots_are_sorted_and_unique() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/slots", PROVIDER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBookingResponses::slot_response("10:00 - 11:00", false),
            MockBookingResponses::slot_response("09:00 - 10:00", false),
            MockBookingResponses::slot_response("09:00 - 09:30", true),
            MockBookingResponses::slot_response("09:00 - 10:00", false)
        ])))
        .mount(&mock_server)
        .await;

    let state = AppState::new(
        TestConfig::with_api_url(&mock_server.uri()).to_arc(),
        Arc::new(remote_store(&mock_server)),
        Arc::new(FixedClock::new(at(8, 0))),
    )
    .unwrap();

    let slots = SlotAvailabilityService::new(&state)
        .resolve_slots(PROVIDER_ID, saturday(), TOKEN)
        .await
        .unwrap();

    let labels: Vec<String> = slots.iter().map(|slot| slot.time.to_string()).collect();
    assert_eq!(labels, vec!["09:00 - 09:30", "09:00 - 10:00", "10:00 - 11:00"]);
    assert!(slots[0].is_booked);
}

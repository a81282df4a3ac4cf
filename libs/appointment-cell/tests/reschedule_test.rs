use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::{
    AppointmentError, AppointmentStatus, AppointmentStore, ReschedulingCoordinator,
    RescheduleRequest, SlotAvailabilityService,
};

mod common;
use common::{appointment, at, saturday, Harness, PROVIDER_ID, TOKEN};

fn request(slot: &str) -> RescheduleRequest {
    RescheduleRequest {
        provider_id: PROVIDER_ID.to_string(),
        date: saturday(),
        slot: slot.to_string(),
    }
}

#[tokio::test]
async fn test_reschedule_into_free_slot() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 10, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let updated = coordinator
        .reschedule("a", &request("14:00 - 15:00"), TOKEN, |_| true)
        .await
        .unwrap();

    assert_eq!(updated.start, at(14, 0));
    assert_eq!(updated.end, at(15, 0));
    assert_eq!(updated.status, AppointmentStatus::Pending);

    let slots = SlotAvailabilityService::new(&harness.state)
        .resolve_slots(PROVIDER_ID, saturday(), TOKEN)
        .await
        .unwrap();
    let booked: Vec<String> = slots
        .iter()
        .filter(|slot| slot.is_booked)
        .map(|slot| slot.time.to_string())
        .collect();
    assert_eq!(booked, vec!["14:00 - 15:00"]);

    let stored = harness.store.get_appointment("a", TOKEN).await.unwrap();
    assert_eq!(stored.start, at(14, 0));
}

#[tokio::test]
async fn test_proposal_describes_the_move() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 10, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let proposal = coordinator.propose("a", &request("13:00 - 14:00"), TOKEN).await.unwrap();

    assert_eq!(proposal.appointment.start, at(10, 0));
    assert_eq!(proposal.new_start(), at(13, 0));
    assert_eq!(proposal.new_end(), at(14, 0));
    assert!(proposal.slot.selectable);

    // proposing writes nothing
    let stored = harness.store.get_appointment("a", TOKEN).await.unwrap();
    assert_eq!(stored.start, at(10, 0));

    let json = serde_json::to_value(&proposal).unwrap();
    assert_eq!(json["slot"]["time"], "13:00 - 14:00");
    assert_eq!(json["resultingStatus"], "pending");
}

#[tokio::test]
async fn test_declined_confirmation_changes_nothing() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 10, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let result = coordinator
        .reschedule("a", &request("14:00 - 15:00"), TOKEN, |proposal| {
            proposal.new_start() == at(9, 0)
        })
        .await;

    assert_matches!(result, Err(AppointmentError::ConfirmationRequired(_)));
    let stored = harness.store.get_appointment("a", TOKEN).await.unwrap();
    assert_eq!((stored.start, stored.end), (at(10, 0), at(11, 0)));
}

#[tokio::test]
async fn test_missed_appointment_becomes_pending() {
    let harness = Harness::with_appointments(
        at(12, 0),
        vec![appointment("a", 9, AppointmentStatus::Missed)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let updated = coordinator
        .reschedule("a", &request("15:00 - 16:00"), TOKEN, |_| true)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Pending);
    assert_eq!(updated.start, at(15, 0));
}

#[tokio::test]
async fn test_derived_missed_appointment_can_be_rescheduled() {
    let harness = Harness::with_appointments(
        at(12, 0),
        vec![appointment("a", 9, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let updated = coordinator
        .reschedule("a", &request("15:00 - 16:00"), TOKEN, |_| true)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Pending);
    assert_eq!(updated.start, at(15, 0));
}

#[tokio::test]
async fn test_start_inside_minimum_lead_is_rejected() {
    let harness = Harness::with_appointments(
        at(8, 45),
        vec![appointment("a", 12, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    assert_matches!(
        coordinator.propose("a", &request("09:00 - 10:00"), TOKEN).await,
        Err(AppointmentError::RescheduleTooSoon { earliest }) if earliest == at(9, 15)
    );
    assert_matches!(
        coordinator.propose("a", &request("08:00 - 09:00"), TOKEN).await,
        Err(AppointmentError::RescheduleTooSoon { .. })
    );
}

#[tokio::test]
async fn test_booked_slot_is_refused() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![
            appointment("a", 10, AppointmentStatus::Pending),
            appointment("b", 14, AppointmentStatus::Approved),
        ],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let result = coordinator.propose("a", &request("14:00 - 15:00"), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::SlotBooked(label)) if label == "14:00 - 15:00");
}

#[tokio::test]
async fn test_invalid_requests_are_validation_errors() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 10, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    // unparsable and inverted labels
    assert_matches!(
        coordinator.propose("a", &request("afternoon"), TOKEN).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        coordinator.propose("a", &request("15:00 - 14:00"), TOKEN).await,
        Err(AppointmentError::Validation(_))
    );

    // the slot it already holds
    assert_matches!(
        coordinator.propose("a", &request("10:00 - 11:00"), TOKEN).await,
        Err(AppointmentError::Validation(_))
    );

    // another provider's calendar
    let mut foreign = request("14:00 - 15:00");
    foreign.provider_id = "prov-2".to_string();
    assert_matches!(
        coordinator.propose("a", &foreign, TOKEN).await,
        Err(AppointmentError::Validation(_))
    );

    // not on the provider's grid
    assert_matches!(
        coordinator.propose("a", &request("14:30 - 15:30"), TOKEN).await,
        Err(AppointmentError::Validation(_))
    );
}

#[tokio::test]
async fn test_terminal_appointment_cannot_be_rescheduled() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 10, AppointmentStatus::Rejected)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    assert_matches!(
        coordinator.propose("a", &request("14:00 - 15:00"), TOKEN).await,
        Err(AppointmentError::InvalidTransition { status: AppointmentStatus::Rejected, .. })
    );
}

#[tokio::test]
async fn test_commit_rechecks_time_against_fresh_now() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![appointment("a", 12, AppointmentStatus::Pending)],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    let proposal = coordinator.propose("a", &request("09:00 - 10:00"), TOKEN).await.unwrap();
    harness.clock.advance(Duration::minutes(45));

    let result = coordinator.commit(proposal.confirm(), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::RescheduleTooSoon { .. }));
    let stored = harness.store.get_appointment("a", TOKEN).await.unwrap();
    assert_eq!(stored.start, at(12, 0));
}

#[tokio::test]
async fn test_second_writer_into_same_slot_gets_conflict() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![
            appointment("a", 10, AppointmentStatus::Pending),
            appointment("b", 11, AppointmentStatus::Pending),
        ],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);

    // Both see the slot free before either writes.
    let first = coordinator.propose("a", &request("14:00 - 15:00"), TOKEN).await.unwrap();
    let second = coordinator.propose("b", &request("14:00 - 15:00"), TOKEN).await.unwrap();

    coordinator.commit(first.confirm(), TOKEN).await.unwrap();
    let lost = coordinator.commit(second.confirm(), TOKEN).await;

    assert_matches!(lost, Err(AppointmentError::Conflict(_)));
    let loser = harness.store.get_appointment("b", TOKEN).await.unwrap();
    assert_eq!((loser.start, loser.end), (at(11, 0), at(12, 0)));
    assert_eq!(loser.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_concurrent_reschedules_exactly_one_wins() {
    let harness = Harness::with_appointments(
        at(8, 0),
        vec![
            appointment("a", 10, AppointmentStatus::Pending),
            appointment("b", 11, AppointmentStatus::Pending),
        ],
    )
    .await;
    let coordinator = ReschedulingCoordinator::new(&harness.state);
    let target = request("14:00 - 15:00");

    let (left, right) = tokio::join!(
        coordinator.reschedule("a", &target, TOKEN, |_| true),
        coordinator.reschedule("b", &target, TOKEN, |_| true),
    );

    let outcomes = [left, right];
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);

    let loser_error = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err())
        .unwrap();
    assert!(loser_error.is_conflict(), "unexpected error: {}", loser_error);

    let slots = SlotAvailabilityService::new(&harness.state)
        .resolve_slots(PROVIDER_ID, saturday(), TOKEN)
        .await
        .unwrap();
    let booked = slots.iter().filter(|slot| slot.is_booked).count();
    // the winner's new slot plus the loser's unchanged one
    assert_eq!(booked, 2);
}

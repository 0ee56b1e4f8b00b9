// libs/appointment-cell/tests/lifecycle_test.rs
use assert_matches::assert_matches;

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::services::lifecycle::AppointmentLifecycleService;

#[test]
fn pending_confirms_and_cancels() {
    let lifecycle = AppointmentLifecycleService::new();

    assert!(lifecycle
        .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Confirmed)
        .is_ok());
    assert!(lifecycle
        .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Cancelled)
        .is_ok());
}

#[test]
fn confirmed_completes_cancels_or_no_shows() {
    let lifecycle = AppointmentLifecycleService::new();

    for target in [
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ] {
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Confirmed, &target)
            .is_ok());
    }
}

#[test]
fn terminal_states_permit_nothing() {
    let lifecycle = AppointmentLifecycleService::new();

    assert_matches!(
        lifecycle.validate_status_transition(
            &AppointmentStatus::Completed,
            &AppointmentStatus::Pending
        ),
        Err(AppointmentError::InvalidStatusTransition { .. })
    );

    assert_matches!(
        lifecycle.validate_status_transition(
            &AppointmentStatus::Cancelled,
            &AppointmentStatus::Confirmed
        ),
        Err(AppointmentError::InvalidStatusTransition { .. })
    );

    for terminal in [
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ] {
        assert!(lifecycle.get_valid_transitions(&terminal).is_empty());
        assert!(terminal.is_terminal());
    }
}

#[test]
fn only_cancellation_frees_the_slot() {
    let lifecycle = AppointmentLifecycleService::new();

    assert!(lifecycle.frees_slot(&AppointmentStatus::Cancelled));
    assert!(!lifecycle.frees_slot(&AppointmentStatus::Confirmed));
    assert!(!lifecycle.frees_slot(&AppointmentStatus::Completed));
    // A no-show is not a cancellation: the slot stays booked
    assert!(!lifecycle.frees_slot(&AppointmentStatus::NoShow));
    assert!(AppointmentStatus::NoShow.holds_slot());
    assert!(!AppointmentStatus::Cancelled.holds_slot());
}

#[test]
fn direct_completion_from_pending_is_legal() {
    let lifecycle = AppointmentLifecycleService::new();

    assert!(lifecycle
        .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Completed)
        .is_ok());
}

#[test]
fn transition_error_reports_both_ends() {
    let lifecycle = AppointmentLifecycleService::new();

    let err = lifecycle
        .validate_status_transition(&AppointmentStatus::Completed, &AppointmentStatus::Confirmed)
        .unwrap_err();

    assert_matches!(
        err,
        AppointmentError::InvalidStatusTransition { from, to }
            if from == AppointmentStatus::Completed && to == AppointmentStatus::Confirmed
    );
}

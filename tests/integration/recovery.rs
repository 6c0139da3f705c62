//! Failure handling: recovery, exhaustion and emergency stops

use sweepd::error::ErrorKind;
use sweepd::models::{RecoveryPhase, StatusChange, SweepEvent, SweepState};
use sweepd::process::ProcessControl;

use super::helpers::*;

/// Drive a running harness into its first recovery attempt.
///
/// The first exit only schedules an early health check; the failed health
/// check is the second consecutive error and starts recovery.
fn enter_recovery(h: &mut Harness) {
    h.exit(1);
    assert_eq!(h.state(), SweepState::Running);
    h.advance(150);
    assert_eq!(h.state(), SweepState::Recovering);
}

fn recovery_results(events: &[SweepEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|event| match event {
            SweepEvent::RecoveryComplete { success, .. } => Some(*success),
            _ => None,
        })
        .collect()
}

#[test]
fn test_unexpected_exit_reports_process_exit() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    h.exit(1);

    let events = h.drain();
    assert_eq!(error_kinds(&events), [ErrorKind::ProcessExit]);
    match &events[0] {
        SweepEvent::Error(error) => {
            assert!(error.message.contains("exit code 1"));
            let details = error.details.as_ref().unwrap();
            assert_eq!(details["frequencyHz"], 2_400_000_000u64);
            assert_eq!(details["operation"], "process_exit");
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(h.coordinator.current_process().is_none());
}

#[test]
fn test_exit_message_carries_last_stderr_error() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.stderr("Stop with Ctrl-C");
    h.drain();

    h.stderr("hackrf_open() failed: Resource busy (LIBUSB_ERROR_BUSY)");
    h.exit(1);

    let events = h.drain();
    let last_error = events
        .iter()
        .rev()
        .find_map(|event| match event {
            SweepEvent::Error(error) => Some(error.message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(last_error.contains("Resource busy"));

    // A busy device gets a recovery attempt straight away
    assert_eq!(h.state(), SweepState::Recovering);
}

#[test]
fn test_recovery_respawns_after_settle() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    enter_recovery(&mut h);

    let events = h.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        SweepEvent::RecoveryStart {
            attempt: 1,
            phase: RecoveryPhase::Retrying,
            ..
        }
    )));
    assert!(error_kinds(&events).contains(&ErrorKind::HealthCheck));
    assert!(h.coordinator.tracker().is_recovering());

    h.advance(100);

    assert_eq!(h.state(), SweepState::Running);
    assert_eq!(h.control.spawn_count(), 2);
    assert!(!h.coordinator.tracker().is_recovering());
    assert_eq!(h.coordinator.tracker().consecutive_errors(), 0);

    let events = h.drain();
    assert_eq!(recovery_results(&events), [true]);
    assert!(matches!(
        events.last(),
        Some(SweepEvent::StatusChange {
            status: StatusChange::Running,
            ..
        })
    ));
}

#[test]
fn test_output_from_replaced_process_is_dropped() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    let old_generation = h.coordinator.current_process().unwrap().generation;
    enter_recovery(&mut h);
    h.advance(100);
    h.drain();

    h.coordinator.handle_output(sweepd::process::ProcessOutput {
        generation: old_generation,
        kind: sweepd::process::OutputKind::Stdout(
            b"2400000000,2420000000,20000,100,-45.2,-50.1,-38.9\n".to_vec(),
        ),
    });
    assert!(h.drain().is_empty());

    h.stdout("2400000000,2420000000,20000,100,-45.2,-50.1,-38.9\n");
    assert_eq!(names(&h.drain()), ["spectrum_data"]);
}

#[test]
fn test_recovery_exhaustion_stops_sweep() {
    let mut h = Harness::with_config(|config| config.recovery.cooldown_period_ms = 1_000);
    h.control.fail_every_spawn(true);
    h.start_mhz(&[2400.0]).expect("spawn failures are not start errors");
    assert_eq!(h.state(), SweepState::Running);

    // Spawn failure, then the early health check starts attempt 1
    h.advance(150);
    assert_eq!(h.state(), SweepState::Recovering);

    // Attempt 1 fails and retries after the short delay
    h.advance(100);
    assert_eq!(h.state(), SweepState::Recovering);
    assert!(!h.coordinator.tracker().is_recovering());
    h.advance(150);
    assert_eq!(h.coordinator.tracker().recovery().attempts(), 2);
    assert_eq!(
        h.coordinator.tracker().recovery().phase(),
        RecoveryPhase::Escalating
    );

    // Attempt 2 fails; escalated attempts wait the full cooldown
    h.advance(100);
    h.advance(150);
    assert_eq!(h.coordinator.tracker().recovery().attempts(), 2);
    h.advance(1_100);
    assert_eq!(h.coordinator.tracker().recovery().attempts(), 3);

    // Attempt 3 fails and recovery gives up
    h.advance(100);
    assert_eq!(h.state(), SweepState::Stopping);
    assert!(!h.coordinator.resource_held());

    h.advance(200);
    assert_eq!(h.state(), SweepState::Idle);

    let events = h.drain();
    assert_eq!(recovery_results(&events), [false, false, false]);
    assert!(error_kinds(&events).contains(&ErrorKind::Recovery));
    assert_eq!(h.coordinator.pending_timers(), 0);
}

#[test]
fn test_too_many_errors_is_fatal() {
    let mut h = Harness::with_config(|config| config.errors.max_consecutive_errors = 3);
    h.start_mhz(&[2400.0]).unwrap();

    h.stderr("ERROR: sweep stalled");
    h.stderr("ERROR: sweep stalled");
    assert_eq!(h.state(), SweepState::Running);
    h.stderr("ERROR: sweep stalled");
    assert_eq!(h.state(), SweepState::Stopping);

    let kinds = error_kinds(&h.drain());
    assert_eq!(kinds.last(), Some(&ErrorKind::Fatal));
}

#[test]
fn test_failed_respawn_counts_toward_error_limit() {
    let mut h = Harness::with_config(|config| config.errors.max_consecutive_errors = 3);
    h.control.fail_every_spawn(true);
    h.start_mhz(&[2400.0]).unwrap();

    h.advance(150);
    assert_eq!(h.state(), SweepState::Recovering);

    // Third error in a row: the respawn failure itself trips the limit
    h.advance(100);
    assert_eq!(h.state(), SweepState::Stopping);
    assert!(!h.coordinator.resource_held());
    let kinds = error_kinds(&h.drain());
    assert_eq!(kinds.last(), Some(&ErrorKind::Fatal));

    h.advance(200);
    assert_eq!(h.state(), SweepState::Idle);
    assert_eq!(h.coordinator.pending_timers(), 0);
}

#[test]
fn test_permission_error_is_not_retried() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    h.stderr("hackrf_open() failed: LIBUSB_ERROR_ACCESS (Access denied)");
    h.exit(1);

    let events = h.drain();
    assert_eq!(
        error_kinds(&events),
        [ErrorKind::Permission, ErrorKind::Permission]
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, SweepEvent::RecoveryStart { .. })));
    assert_eq!(h.state(), SweepState::Running);
}

#[test]
fn test_silent_process_fails_health_check() {
    let mut h = Harness::with_config(|config| {
        config.health.interval_ms = 100;
        config.health.data_timeout_ms = 20;
    });
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    std::thread::sleep(std::time::Duration::from_millis(40));
    h.advance(150);

    let events = h.drain();
    assert_eq!(error_kinds(&events), [ErrorKind::HealthCheck]);
    assert!(h.coordinator.current_process().is_none());
    assert_eq!(h.control.stops(), 1);
}

#[test]
fn test_emergency_stop_mid_recovery() {
    let mut h = Harness::with_config(|config| config.recovery.settle_delay_ms = 10_000);
    h.start_mhz(&[2400.0, 915.0]).unwrap();
    enter_recovery(&mut h);
    assert!(h.coordinator.tracker().is_recovering());
    h.drain();

    let snapshot = h.coordinator.emergency_stop();

    assert_eq!(snapshot.state, SweepState::Idle);
    assert!(!h.coordinator.tracker().is_recovering());
    let cycle = h.coordinator.cycler().state();
    assert!(cycle.cycle_timer.is_none());
    assert!(cycle.switch_timer.is_none());
    assert_eq!(h.coordinator.pending_timers(), 0);
    assert_eq!(h.control.tracked_count(), 0);
    assert!(!h.coordinator.resource_held());

    let events = h.drain();
    assert_eq!(states(&events), [SweepState::Idle]);
    assert!(matches!(
        events.last(),
        Some(SweepEvent::StatusChange {
            status: StatusChange::EmergencyStopped,
            ..
        })
    ));

    // Nothing left to fire
    h.advance(20_000);
    assert_eq!(h.control.spawn_count(), 1);
    assert_eq!(h.state(), SweepState::Idle);
}

#[test]
fn test_emergency_stop_when_idle_is_silent() {
    let mut h = Harness::new();
    let snapshot = h.coordinator.emergency_stop();
    assert_eq!(snapshot.state, SweepState::Idle);
    assert!(h.drain().is_empty());
}

#[test]
fn test_failed_spawn_recovers_on_next_attempt() {
    let mut h = Harness::new();
    h.control.fail_next_spawns(1);
    h.start_mhz(&[2400.0]).unwrap();
    assert!(h.coordinator.current_process().is_none());
    assert_eq!(error_kinds(&h.drain()), [ErrorKind::Hardware]);

    h.advance(150);
    assert_eq!(h.state(), SweepState::Recovering);
    h.advance(100);

    assert_eq!(h.state(), SweepState::Running);
    assert!(h.coordinator.current_process().is_some());
    assert_eq!(h.control.spawn_count(), 1);
    assert_eq!(recovery_results(&h.drain()), [true]);
}

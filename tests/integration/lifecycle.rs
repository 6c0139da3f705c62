//! Start, stream and stop a single-frequency sweep

use sweepd::error::{ErrorKind, SweepError};
use sweepd::models::{StatusChange, SweepEvent, SweepState};
use sweepd::orchestrator::{HardwareResource, SweepRequest};

use super::helpers::*;

#[test]
fn test_start_single_frequency() {
    let mut h = Harness::new();

    let snapshot = h.start_mhz(&[2400.0]).expect("start failed");
    assert_eq!(snapshot.state, SweepState::Running);
    assert_eq!(snapshot.current_frequency_hz, Some(2_400_000_000));
    assert!(!snapshot.is_cycling);

    let events = h.drain();
    assert_eq!(names(&events)[..2], ["status", "cycle_config"]);
    match &events[1] {
        SweepEvent::CycleConfig(config) => {
            assert!(!config.is_cycling);
            assert_eq!(config.frequencies.len(), 1);
        }
        other => panic!("expected cycle_config, got {other:?}"),
    }

    assert_eq!(h.control.spawn_count(), 1);
    assert_eq!(h.control.last_range().as_deref(), Some("2390:2410"));
    assert!(h.coordinator.resource_held());
}

#[test]
fn test_stdout_line_becomes_spectrum_data() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    h.stdout("2400000000,2420000000,20000,100,-45.2,-50.1,-38.9\n");

    let events = h.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        SweepEvent::SpectrumData {
            frequency, power, ..
        } => {
            assert_eq!(*frequency, 2410.0);
            assert_eq!(*power, -38.9);
        }
        other => panic!("expected spectrum_data, got {other:?}"),
    }
}

#[test]
fn test_line_split_across_chunks() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    h.stdout("2024-01-15, 10:30:00.123456, 2400000000, 24050");
    assert!(h.drain().is_empty());
    assert!(h.coordinator.buffered_bytes() > 0);

    h.stdout("00000, 1000000.00, 20, -70.5, -68.2, -72.1, -69.8, -71.3\nsweeping...\n");
    let events = h.drain();
    assert_eq!(names(&events), ["spectrum_data"]);
    assert_eq!(h.coordinator.buffered_bytes(), 0);
}

#[test]
fn test_samples_reset_error_streak() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();

    h.stderr("hackrf_sweep: transfer failed");
    assert_eq!(h.coordinator.tracker().consecutive_errors(), 1);

    h.stdout("2400000000,2420000000,20000,100,-45.2,-50.1,-38.9\n");
    assert_eq!(h.coordinator.tracker().consecutive_errors(), 0);
}

#[test]
fn test_stop_from_idle_is_silent() {
    let mut h = Harness::new();

    let snapshot = h.coordinator.stop();
    assert_eq!(snapshot.state, SweepState::Idle);
    assert!(h.drain().is_empty());
    assert_eq!(h.coordinator.pending_timers(), 0);
}

#[test]
fn test_stop_releases_even_when_kill_fails() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.control.fail_stop(true);
    h.drain();

    let snapshot = h.coordinator.stop();
    assert_eq!(snapshot.state, SweepState::Stopping);
    assert!(!h.coordinator.resource_held());
    assert!(h.coordinator.current_process().is_none());
    assert_eq!(h.control.stops(), 1);

    h.advance(200);
    assert_eq!(h.state(), SweepState::Idle);

    let events = h.drain();
    assert_eq!(states(&events), [SweepState::Stopping, SweepState::Idle]);
    assert!(matches!(
        events.last(),
        Some(SweepEvent::StatusChange {
            status: StatusChange::Stopped,
            ..
        })
    ));
    assert_eq!(h.coordinator.pending_timers(), 0);
}

#[test]
fn test_stop_is_idempotent_while_settling() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();

    h.coordinator.stop();
    h.drain();
    let snapshot = h.coordinator.stop();
    assert_eq!(snapshot.state, SweepState::Stopping);
    assert!(h.drain().is_empty());
    assert_eq!(h.control.stops(), 1);
}

#[test]
fn test_start_while_stopping_finishes_stop_first() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.coordinator.stop();
    h.drain();

    h.start_mhz(&[915.0]).expect("restart failed");
    let events = h.drain();
    assert_eq!(states(&events)[..2], [SweepState::Idle, SweepState::Running]);
    assert_eq!(h.control.last_range().as_deref(), Some("905:925"));

    // The settle timer from the first stop must not end the new run
    h.advance(500);
    assert_eq!(h.state(), SweepState::Running);
}

#[test]
fn test_second_start_rejected_while_running() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.drain();

    let err = h.start_mhz(&[915.0]).unwrap_err();
    assert!(matches!(err, SweepError::AlreadyRunning));
    assert_eq!(error_kinds(&h.drain()), [ErrorKind::StateConflict]);
    assert_eq!(h.control.spawn_count(), 1);
}

#[test]
fn test_stale_running_state_is_reset() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    h.control.kill_silently();

    h.start_mhz(&[915.0]).expect("stale state should not block a start");
    assert_eq!(h.control.spawn_count(), 2);
    assert_eq!(h.control.last_range().as_deref(), Some("905:925"));
    assert_eq!(h.state(), SweepState::Running);
}

#[test]
fn test_invalid_requests_rejected() {
    let mut h = Harness::new();

    let err = h.start(SweepRequest::default()).unwrap_err();
    assert!(matches!(err, SweepError::InvalidFrequencies(_)));

    let err = h.start_mhz(&[8000.0]).unwrap_err();
    assert!(matches!(err, SweepError::FrequencyOutOfRange { .. }));

    assert_eq!(
        error_kinds(&h.drain()),
        [ErrorKind::Validation, ErrorKind::Validation]
    );
    assert_eq!(h.state(), SweepState::Idle);
    assert!(!h.coordinator.resource_held());
    assert_eq!(h.control.spawn_count(), 0);
}

#[test]
fn test_busy_resource_rejects_start() {
    let mut h = Harness::new();
    let mut config = test_config(&h.lock_dir);
    config.resource.name = "hackrf".to_string();
    let mut other = HardwareResource::new(&config.resource);
    other.acquire().expect("first owner should get the lock");

    let err = h.start_mhz(&[2400.0]).unwrap_err();
    assert!(matches!(err, SweepError::ResourceBusy { .. }));
    assert_eq!(error_kinds(&h.drain()), [ErrorKind::ResourceConflict]);
    assert_eq!(h.control.spawn_count(), 0);

    other.release();
    h.start_mhz(&[2400.0]).expect("start after release failed");
}

#[test]
fn test_exit_during_stop_is_quiet() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    let generation = h.coordinator.current_process().unwrap().generation;
    h.coordinator.stop();
    h.drain();

    h.coordinator.handle_output(sweepd::process::ProcessOutput {
        generation,
        kind: sweepd::process::OutputKind::Exited {
            code: None,
            signal: Some(15),
        },
    });
    assert!(error_kinds(&h.drain()).is_empty());
}

#[test]
fn test_health_check_when_idle_probes_hardware() {
    let h = Harness::new();
    let report = h.coordinator.check_health();
    assert!(!report.connected);
    assert!(report.error.unwrap().contains("no device"));
}

#[test]
fn test_health_check_while_running_reports_process() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();
    assert!(h.coordinator.check_health().connected);

    h.control.kill_silently();
    let report = h.coordinator.check_health();
    assert!(!report.connected);
    assert!(report.error.is_some());
}

#[test]
fn test_force_cleanup_kills_orphans() {
    let mut h = Harness::new();
    h.start_mhz(&[2400.0]).unwrap();

    let snapshot = h.coordinator.force_cleanup();
    assert_eq!(snapshot.state, SweepState::Idle);
    assert_eq!(h.control.force_kills(), 1);
    assert_eq!(h.control.cleanups(), 1);
    assert!(!h.coordinator.resource_held());
}

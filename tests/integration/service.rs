//! The threaded service: commands, routed process output and shutdown

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use sweepd::error::SweepError;
use sweepd::models::{SweepEvent, SweepState};
use sweepd::orchestrator::SweepService;
use sweepd::process::{OutputKind, ProcessControl};

use super::helpers::*;

const WAIT: Duration = Duration::from_secs(5);

/// Receive events until one matches, failing after [`WAIT`].
fn wait_for(events: &Receiver<SweepEvent>, pred: impl Fn(&SweepEvent) -> bool) -> SweepEvent {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = events
            .recv_timeout(remaining)
            .expect("timed out waiting for event");
        if pred(&event) {
            return event;
        }
    }
}

fn start_service() -> (SweepService, Arc<FakeControl>, TempDir) {
    let lock_dir = TempDir::new().expect("Failed to create temp dir");
    let control = FakeControl::new();
    let dyn_control: Arc<dyn ProcessControl> = control.clone();
    let service = SweepService::start(test_config(&lock_dir), dyn_control).expect("service start");
    (service, control, lock_dir)
}

#[test]
fn test_service_streams_process_output() {
    let (mut service, control, _dir) = start_service();
    let events = service.subscribe();

    let snapshot = service.start_sweep(request_mhz(&[2400.0])).unwrap();
    assert_eq!(snapshot.state, SweepState::Running);

    control.emit(OutputKind::Stdout(
        b"2400000000,2420000000,20000,100,-45.2,-50.1,-38.9\n".to_vec(),
    ));
    let event = wait_for(&events, |e| matches!(e, SweepEvent::SpectrumData { .. }));
    match event {
        SweepEvent::SpectrumData { frequency, .. } => assert_eq!(frequency, 2410.0),
        _ => unreachable!(),
    }

    assert_eq!(service.get_status().unwrap().state, SweepState::Running);
    service.shutdown();
}

#[test]
fn test_service_stop_settles_to_idle() {
    let (mut service, control, _dir) = start_service();
    let events = service.subscribe();
    service.start_sweep(request_mhz(&[2400.0])).unwrap();

    let snapshot = service.stop_sweep().unwrap();
    assert_eq!(snapshot.state, SweepState::Stopping);

    // The worker fires the settle timer on its own
    wait_for(&events, |e| {
        matches!(e, SweepEvent::Status(s) if s.state == SweepState::Idle)
    });
    assert_eq!(service.get_status().unwrap().state, SweepState::Idle);
    assert_eq!(control.tracked_count(), 0);
    service.shutdown();
}

#[test]
fn test_service_rejects_second_start() {
    let (service, _control, _dir) = start_service();
    service.start_sweep(request_mhz(&[2400.0])).unwrap();

    let err = service.start_sweep(request_mhz(&[915.0])).unwrap_err();
    assert!(matches!(err, SweepError::AlreadyRunning));
}

#[test]
fn test_service_emergency_stop_and_health() {
    let (service, control, _dir) = start_service();
    service.start_sweep(request_mhz(&[2400.0])).unwrap();
    assert!(service.check_health().unwrap().connected);

    let snapshot = service.emergency_stop().unwrap();
    assert_eq!(snapshot.state, SweepState::Idle);
    assert_eq!(control.tracked_count(), 0);
    assert!(!service.check_health().unwrap().connected);
}

#[test]
fn test_shutdown_kills_running_sweep() {
    let (mut service, control, _dir) = start_service();
    service.start_sweep(request_mhz(&[2400.0])).unwrap();
    assert_eq!(control.tracked_count(), 1);

    service.shutdown();
    service.shutdown();
    assert_eq!(control.tracked_count(), 0);
    assert!(matches!(
        service.get_status(),
        Err(SweepError::ServiceUnavailable)
    ));
}

#[test]
fn test_invalid_config_refused() {
    let lock_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&lock_dir);
    config.sweep.bin_width_hz = 0;
    let control: Arc<dyn ProcessControl> = FakeControl::new();

    let result = SweepService::start(config, control);
    assert!(matches!(result, Err(SweepError::Config(_))));
}

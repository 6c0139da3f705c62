//! Hardware availability probing against scripted info binaries

use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use sweepd::orchestrator::SweepService;
use sweepd::process::availability::{probe, Availability};
use sweepd::process::{ProcessControl, ProcessManager};

use super::helpers::*;

const FOUND: &str = "echo 'hackrf_info version: 2023.01.1'\n\
                     echo 'Found HackRF'\n\
                     echo 'Serial number: 0000000000000000457863c8234e1c4f'\n\
                     echo 'Board ID Number: 2 (HackRF One)'";

#[test]
#[serial]
fn test_probe_reports_board() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let info = write_script(dir.path(), "fake_info", FOUND).unwrap();

    let report = probe(&info, Duration::from_secs(5));
    assert_eq!(report.availability, Availability::Available);
    let device = report.device_info.unwrap();
    assert_eq!(device.serial.as_deref(), Some("0000000000000000457863c8234e1c4f"));
}

#[test]
#[serial]
fn test_probe_reports_busy_board() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let info = write_script(
        dir.path(),
        "fake_info",
        "echo 'Found HackRF'\necho 'hackrf_open() failed: Resource busy (-1000)' >&2\nexit 1",
    )
    .unwrap();

    assert_eq!(
        probe(&info, Duration::from_secs(5)).availability,
        Availability::Busy
    );
}

#[test]
#[serial]
fn test_missing_info_binary_is_unknown() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let report = probe(&dir.path().join("missing"), Duration::from_secs(1));
    assert_eq!(report.availability, Availability::Unknown);
}

#[test]
#[serial]
fn test_service_health_uses_info_binary() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let info = write_script(dir.path(), "fake_info", FOUND).unwrap();
    let sweep = write_script(dir.path(), "fake_sweep", "exec sleep 30").unwrap();

    let mut config = e2e_config(&dir, sweep);
    config.sweep.info_binary = info;
    let control: Arc<dyn ProcessControl> =
        Arc::new(ProcessManager::new(&config.sweep, config.process.clone()));
    let mut service = SweepService::start(config, control).unwrap();

    let report = service.check_health().unwrap();
    assert!(report.connected);
    assert_eq!(
        report.device_info.unwrap().board_id.as_deref(),
        Some("2 (HackRF One)")
    );
    service.shutdown();
}

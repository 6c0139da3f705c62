//! Test helper functions for E2E tests

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use sweepd::config::SweepdConfig;
use sweepd::models::SweepEvent;

/// One spectrum line in the sweep binary's output format
pub const SAMPLE_LINE: &str =
    "2024-01-15, 10:30:00.123456, 2400000000, 2420000000, 1000000.00, 20, -45.2, -50.1, -38.9";

/// Write an executable `/bin/sh` script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;
    Ok(path)
}

/// Config pointing at scripts in `dir`, with short delays and no pkill
pub fn e2e_config(dir: &TempDir, binary: PathBuf) -> SweepdConfig {
    let mut config = SweepdConfig::default();
    config.sweep.binary = binary;
    config.sweep.info_binary = dir.path().join("missing_info");
    config.resource.lock_dir = dir.path().join("locks");
    config.process.system_cleanup = false;
    config.process.stop_grace_ms = 200;
    config.recovery.settle_delay_ms = 100;
    config.recovery.recovery_delay_ms = 100;
    config.coordinator.stop_settle_ms = 50;
    config
}

/// Receive events until one matches or `timeout` passes
pub fn wait_for_event(
    events: &Receiver<SweepEvent>,
    timeout: Duration,
    pred: impl Fn(&SweepEvent) -> bool,
) -> Option<SweepEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match events.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

/// Poll `check` every 20ms until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    check()
}

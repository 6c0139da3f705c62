//! Hardware presence probe using the info binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::models::DeviceInfo;

/// Time allowed for reader threads to finish after the probe exits
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Busy,
    NotFound,
    Timeout,
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::NotFound => "not found",
            Availability::Timeout => "timeout",
            Availability::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub availability: Availability,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

impl AvailabilityReport {
    pub fn new(availability: Availability, reason: impl Into<String>) -> Self {
        Self {
            availability,
            reason: reason.into(),
            device_info: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Run `info_binary` and classify what it reports, killing it after `timeout`.
pub fn probe(info_binary: &Path, timeout: Duration) -> AvailabilityReport {
    let mut child = match Command::new(info_binary)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(binary = %info_binary.display(), error = %e, "hardware probe could not start");
            return AvailabilityReport::new(
                Availability::Unknown,
                format!("failed to run {}: {e}", info_binary.display()),
            );
        }
    };

    // Drain both pipes while waiting so a chatty probe cannot block on write
    let (stdout_tx, stdout_rx) = mpsc::channel();
    let (stderr_tx, stderr_rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stdout.read_to_string(&mut text);
            let _ = stdout_tx.send(text);
        });
    }
    if let Some(mut stderr) = child.stderr.take() {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            let _ = stderr_tx.send(text);
        });
    }

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return AvailabilityReport::new(
                Availability::Timeout,
                format!("{} did not answer within {timeout:?}", info_binary.display()),
            );
        }
        Err(e) => {
            let _ = child.kill();
            return AvailabilityReport::new(
                Availability::Unknown,
                format!("failed to wait for {}: {e}", info_binary.display()),
            );
        }
    };

    let stdout = stdout_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_default();
    let stderr = stderr_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_default();
    debug!(code = ?status.code(), "hardware probe finished");

    classify_probe(&stdout, &stderr, status.success())
}

/// Classify probe output. Busy wins over a found board since a board that is
/// listed but cannot be opened is unusable.
pub fn classify_probe(stdout: &str, stderr: &str, success: bool) -> AvailabilityReport {
    let combined = format!("{stdout}\n{stderr}").to_lowercase();

    if combined.contains("busy") {
        return AvailabilityReport::new(
            Availability::Busy,
            "device is in use by another process",
        );
    }

    if combined.contains("found hackrf") || combined.contains("serial number") {
        return AvailabilityReport {
            availability: Availability::Available,
            reason: "device detected".to_string(),
            device_info: parse_device_info(stdout),
        };
    }

    if combined.contains("no hackrf") || combined.contains("not found") {
        return AvailabilityReport::new(Availability::NotFound, "no device connected");
    }

    let detail = stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(if success {
            "probe produced no output"
        } else {
            "probe failed without output"
        });
    AvailabilityReport::new(Availability::Unknown, detail)
}

/// Extract board details from info output. Returns `None` if nothing matched.
pub fn parse_device_info(stdout: &str) -> Option<DeviceInfo> {
    let mut info = DeviceInfo::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_lowercase().as_str() {
            "serial number" => info.serial = Some(value),
            "board id number" => info.board_id = Some(value),
            "firmware version" => info.firmware = Some(value),
            "part id number" => info.part_id = Some(value),
            _ => {}
        }
    }
    (info != DeviceInfo::default()).then_some(info)
}

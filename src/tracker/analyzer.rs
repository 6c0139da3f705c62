//! Error analyzer: classifies sweep failures from their message text.

use serde::{Deserialize, Serialize};

use crate::models::DeviceStatus;

/// Failure class derived from the error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    DeviceBusy,
    PermissionDenied,
    DeviceNotFound,
    UsbError,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    RetryAfterDelay,
    RestartDevice,
    CheckPermissions,
    CheckConnection,
    ResetUsb,
    Monitor,
}

/// Verdict for a single recorded error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub error_type: ErrorType,
    pub severity: Severity,
    pub is_recoverable: bool,
    pub recommended_action: RecommendedAction,
    pub requires_restart: bool,
}

/// Classifies an error message (case-insensitive substring match).
///
/// Busy is checked before USB so `LIBUSB_ERROR_BUSY` lands on `DeviceBusy`.
pub fn classify_error(message: &str) -> ErrorType {
    let msg = message.to_lowercase();

    if msg.contains("busy") {
        return ErrorType::DeviceBusy;
    }

    if msg.contains("permission denied")
        || msg.contains("access denied")
        || msg.contains("libusb_error_access")
        || msg.contains("insufficient permissions")
    {
        return ErrorType::PermissionDenied;
    }

    if msg.contains("not found")
        || msg.contains("not_found")
        || msg.contains("no hackrf")
        || msg.contains("no such device")
        || msg.contains("libusb_error_no_device")
    {
        return ErrorType::DeviceNotFound;
    }

    if msg.contains("usb") || msg.contains("transfer") || msg.contains("pipe error") {
        return ErrorType::UsbError;
    }

    ErrorType::Unknown
}

/// Build the verdict for an error of `error_type`.
///
/// `consecutive_busy` counts busy errors in a row including this one;
/// `consecutive_errors` counts all errors in a row including this one.
pub fn analyze(error_type: ErrorType, consecutive_errors: u32, consecutive_busy: u32) -> ErrorAnalysis {
    match error_type {
        ErrorType::DeviceBusy => {
            let requires_restart = consecutive_busy > 5;
            ErrorAnalysis {
                error_type,
                severity: if consecutive_busy > 3 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                is_recoverable: true,
                recommended_action: if requires_restart {
                    RecommendedAction::RestartDevice
                } else {
                    RecommendedAction::RetryAfterDelay
                },
                requires_restart,
            }
        }
        ErrorType::PermissionDenied => ErrorAnalysis {
            error_type,
            severity: Severity::High,
            is_recoverable: false,
            recommended_action: RecommendedAction::CheckPermissions,
            requires_restart: false,
        },
        ErrorType::DeviceNotFound => ErrorAnalysis {
            error_type,
            severity: Severity::High,
            is_recoverable: true,
            recommended_action: RecommendedAction::CheckConnection,
            requires_restart: true,
        },
        ErrorType::UsbError => ErrorAnalysis {
            error_type,
            severity: Severity::Medium,
            is_recoverable: true,
            recommended_action: RecommendedAction::ResetUsb,
            requires_restart: true,
        },
        ErrorType::Unknown => ErrorAnalysis {
            error_type,
            severity: match consecutive_errors {
                0..=2 => Severity::Low,
                3..=5 => Severity::Medium,
                _ => Severity::High,
            },
            is_recoverable: true,
            recommended_action: if consecutive_errors > 2 {
                RecommendedAction::RetryAfterDelay
            } else {
                RecommendedAction::Monitor
            },
            requires_restart: false,
        },
    }
}

/// Device status implied by an error class, if the class is conclusive
pub fn status_for(error_type: ErrorType) -> Option<DeviceStatus> {
    match error_type {
        ErrorType::DeviceBusy => Some(DeviceStatus::Busy),
        ErrorType::DeviceNotFound | ErrorType::UsbError => Some(DeviceStatus::Disconnected),
        ErrorType::PermissionDenied | ErrorType::Unknown => None,
    }
}

/// True when a stderr line reports a failure rather than progress.
pub fn is_error_line(line: &str) -> bool {
    let msg = line.to_lowercase();
    [
        "error",
        "failed",
        "busy",
        "permission denied",
        "access denied",
        "not found",
        "no such device",
        "usb",
    ]
    .iter()
    .any(|needle| msg.contains(needle))
}

//! Events emitted by the coordinator to observers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::{DeviceInfo, DeviceStatus, RecoveryPhase};
use super::frequency::Frequency;
use super::sample::Sample;
use crate::error::ErrorKind;

/// Coordinator state machine tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepState {
    #[default]
    Idle,
    Running,
    Recovering,
    Stopping,
}

impl SweepState {
    /// Running or recovering: a sweep owns the hardware
    pub fn is_active(self) -> bool {
        matches!(self, SweepState::Running | SweepState::Recovering)
    }
}

/// Full status snapshot, emitted on every transition and returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: SweepState,
    pub current_frequency_hz: Option<u64>,
    /// Position within the current frequency cycle, 0-100
    pub progress: Option<f64>,
    pub total_sweeps: u64,
    pub completed_sweeps: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub is_cycling: bool,
    pub health_score: f64,
    pub device_status: DeviceStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn idle(health_score: f64, device_status: DeviceStatus) -> Self {
        Self {
            state: SweepState::Idle,
            current_frequency_hz: None,
            progress: None,
            total_sweeps: 0,
            completed_sweeps: 0,
            start_time: None,
            is_cycling: false,
            health_score,
            device_status,
            timestamp: Utc::now(),
        }
    }
}

/// Lightweight transition tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    Switching,
    Running,
    Stopped,
    EmergencyStopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfigEvent {
    pub frequencies: Vec<Frequency>,
    pub cycle_time_ms: u64,
    pub switching_time_ms: u64,
    /// Time to visit every frequency once
    pub total_cycle_ms: u64,
    pub is_cycling: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Every event the orchestrator publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SweepEvent {
    Status(StatusSnapshot),
    StatusChange {
        status: StatusChange,
        timestamp: DateTime<Utc>,
    },
    CycleConfig(CycleConfigEvent),
    SpectrumData {
        /// Center of the sample in MHz
        frequency: f64,
        /// Peak power in dBm
        power: f64,
        data: Sample,
        timestamp: DateTime<Utc>,
    },
    Error(ErrorEvent),
    RecoveryStart {
        attempt: u32,
        phase: RecoveryPhase,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RecoveryComplete {
        attempt: u32,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

impl SweepEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SweepEvent::Status(_) => "status",
            SweepEvent::StatusChange { .. } => "status_change",
            SweepEvent::CycleConfig(_) => "cycle_config",
            SweepEvent::SpectrumData { .. } => "spectrum_data",
            SweepEvent::Error(_) => "error",
            SweepEvent::RecoveryStart { .. } => "recovery_start",
            SweepEvent::RecoveryComplete { .. } => "recovery_complete",
        }
    }

    pub fn status_change(status: StatusChange) -> Self {
        SweepEvent::StatusChange {
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Result of `check_health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_update: DateTime<Utc>,
}

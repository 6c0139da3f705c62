use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the tracker believes about the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Unknown,
    Available,
    Busy,
    Stuck,
    Disconnected,
}

impl DeviceStatus {
    /// Health-score penalty; higher means worse.
    pub fn penalty(self) -> f64 {
        match self {
            DeviceStatus::Available => 0.0,
            DeviceStatus::Busy => 20.0,
            DeviceStatus::Stuck => 30.0,
            DeviceStatus::Unknown | DeviceStatus::Disconnected => 40.0,
        }
    }
}

/// Recovery progress as seen from the device side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPhase {
    #[default]
    None,
    Retrying,
    Escalating,
    CoolingDown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub status: DeviceStatus,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_busy: u32,
    pub recovery: RecoveryPhase,
}

impl DeviceState {
    pub fn reset(&mut self) {
        *self = DeviceState::default();
    }
}

/// Board details reported by the hardware-info probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub serial: Option<String>,
    pub board_id: Option<String>,
    pub firmware: Option<String>,
    pub part_id: Option<String>,
}

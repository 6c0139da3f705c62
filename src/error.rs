//! Error taxonomy for the sweep orchestration core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the sweep service and its components.
#[derive(Error, Debug)]
pub enum SweepError {
    /// The requested frequency list was empty or contained nothing usable
    #[error("Invalid frequency list: {0}")]
    InvalidFrequencies(String),

    /// A frequency cannot be swept with the supported tuning range
    #[error("Frequency {center_mhz} MHz is outside the supported range {min_mhz}-{max_mhz} MHz")]
    FrequencyOutOfRange {
        center_mhz: f64,
        min_mhz: u32,
        max_mhz: u32,
    },

    /// A sweep is genuinely running
    #[error("sweep already in progress")]
    AlreadyRunning,

    /// The exclusive hardware resource is owned by someone else
    #[error("Hardware resource '{resource}' is held by {owner}")]
    ResourceBusy { resource: String, owner: String },

    /// The sweep binary could not be launched
    #[error("Failed to spawn {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delivering a signal to the sweep process failed
    #[error("Failed to signal process: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The service worker thread is gone
    #[error("Sweep service is not running")]
    ServiceUnavailable,
}

impl SweepError {
    /// The event tag observers see for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SweepError::InvalidFrequencies(_) | SweepError::FrequencyOutOfRange { .. } => {
                ErrorKind::Validation
            }
            SweepError::AlreadyRunning => ErrorKind::StateConflict,
            SweepError::ResourceBusy { .. } => ErrorKind::ResourceConflict,
            SweepError::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ErrorKind::Permission
            }
            SweepError::Spawn { .. } | SweepError::Signal(_) | SweepError::Io(_) => {
                ErrorKind::Hardware
            }
            SweepError::Config(_) => ErrorKind::Validation,
            SweepError::ServiceUnavailable => ErrorKind::Fatal,
        }
    }
}

/// Category tag carried by `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    StateConflict,
    ResourceConflict,
    Hardware,
    Permission,
    ProcessExit,
    HealthCheck,
    Recovery,
    Blacklist,
    Parse,
    Fatal,
}

pub type Result<T> = std::result::Result<T, SweepError>;

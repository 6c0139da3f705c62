//! Configuration for the sweep daemon.
//!
//! Every threshold the coordinator, tracker and buffer use lives here with its
//! default. Sections may be omitted from `config.toml`; missing keys fall back
//! to the defaults below.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SweepError;

/// File name looked up under the user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepdConfig {
    pub sweep: SweepConfig,
    pub process: ProcessConfig,
    pub buffer: BufferConfig,
    pub errors: ErrorConfig,
    pub recovery: RecoveryConfig,
    pub health: HealthConfig,
    pub resource: ResourceConfig,
    pub coordinator: CoordinatorConfig,
}

/// Sweep binary invocation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    pub binary: PathBuf,
    pub info_binary: PathBuf,
    /// Half-width of the swept span around the center frequency
    pub span_mhz: u32,
    pub min_freq_mhz: u32,
    pub max_freq_mhz: u32,
    pub bin_width_hz: u32,
    pub vga_gain: u32,
    pub lna_gain: u32,
    /// Centers strictly above this use the high-band gain pair
    pub high_band_threshold_mhz: u32,
    pub high_band_vga_gain: u32,
    pub high_band_lna_gain: u32,
    pub default_cycle_time_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("hackrf_sweep"),
            info_binary: PathBuf::from("hackrf_info"),
            span_mhz: 10,
            min_freq_mhz: 1,
            max_freq_mhz: 7250,
            bin_width_hz: 20_000,
            vga_gain: 20,
            lna_gain: 32,
            high_band_threshold_mhz: 5000,
            high_band_vga_gain: 30,
            high_band_lna_gain: 40,
            default_cycle_time_ms: 10_000,
        }
    }
}

/// Process lifecycle parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessConfig {
    /// Wait between SIGTERM and SIGKILL
    pub stop_grace_ms: u64,
    pub availability_timeout_ms: u64,
    /// Pattern-kill leftover sweep binaries after every stop
    pub system_cleanup: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: 100,
            availability_timeout_ms: 5000,
            system_cleanup: true,
        }
    }
}

impl ProcessConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn availability_timeout(&self) -> Duration {
        Duration::from_millis(self.availability_timeout_ms)
    }
}

/// Buffer manager limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    pub max_buffer_size: usize,
    pub max_line_length: usize,
    /// Overflow count after which warnings escalate
    pub overflow_warning_threshold: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 1024 * 1024,
            max_line_length: 10_000,
            overflow_warning_threshold: 5,
        }
    }
}

/// Error tracker thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErrorConfig {
    pub max_consecutive_errors: u32,
    pub max_failures_per_minute: u32,
    pub blacklist_threshold: u32,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 8,
            max_failures_per_minute: 5,
            blacklist_threshold: 3,
        }
    }
}

/// Recovery manager bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecoveryConfig {
    pub max_recovery_attempts: u32,
    /// Cooldown after an attempt before another may start
    pub recovery_delay_ms: u64,
    pub escalation_threshold: u32,
    /// Cooldown used instead of `recovery_delay_ms` once escalating
    pub cooldown_period_ms: u64,
    /// Wait between killing the process and respawning it
    pub settle_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: 3,
            recovery_delay_ms: 2000,
            escalation_threshold: 5,
            cooldown_period_ms: 30_000,
            settle_delay_ms: 1000,
        }
    }
}

impl RecoveryConfig {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    pub fn cooldown_period(&self) -> Duration {
        Duration::from_millis(self.cooldown_period_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Periodic health check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_ms: u64,
    /// Maximum silence from the sweep process before it is considered hung
    pub data_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            data_timeout_ms: 30_000,
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_millis(self.data_timeout_ms)
    }
}

/// Exclusive hardware resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourceConfig {
    pub name: String,
    pub lock_dir: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        let base = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            name: "hackrf".to_string(),
            lock_dir: base.join("sweepd"),
        }
    }
}

/// Coordinator timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Delay between the Stopping snapshot and the final Idle snapshot
    pub stop_settle_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { stop_settle_ms: 100 }
    }
}

impl SweepdConfig {
    /// Load configuration from an explicit path, the user config directory, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Reject values that would make the state machine misbehave.
    pub fn validate(&self) -> Result<(), SweepError> {
        let zero = |name: &str| SweepError::Config(format!("{name} must be greater than zero"));

        if self.sweep.min_freq_mhz >= self.sweep.max_freq_mhz {
            return Err(SweepError::Config(format!(
                "sweep.min_freq_mhz ({}) must be below sweep.max_freq_mhz ({})",
                self.sweep.min_freq_mhz, self.sweep.max_freq_mhz
            )));
        }
        if self.sweep.bin_width_hz == 0 {
            return Err(zero("sweep.bin_width_hz"));
        }
        if self.sweep.default_cycle_time_ms == 0 {
            return Err(zero("sweep.default_cycle_time_ms"));
        }
        if self.buffer.max_buffer_size == 0 {
            return Err(zero("buffer.max_buffer_size"));
        }
        if self.buffer.max_line_length == 0 {
            return Err(zero("buffer.max_line_length"));
        }
        if self.errors.max_consecutive_errors == 0 {
            return Err(zero("errors.max_consecutive_errors"));
        }
        if self.errors.max_failures_per_minute == 0 {
            return Err(zero("errors.max_failures_per_minute"));
        }
        if self.errors.blacklist_threshold == 0 {
            return Err(zero("errors.blacklist_threshold"));
        }
        if self.health.interval_ms == 0 {
            return Err(zero("health.interval_ms"));
        }
        if self.resource.name.trim().is_empty() {
            return Err(SweepError::Config("resource.name must not be empty".into()));
        }
        Ok(())
    }
}

/// `<config_dir>/sweepd/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sweepd").join(CONFIG_FILE_NAME))
}

//! Error tracker: counts failures, derives device status, and gates recovery.
//!
//! Every failure the coordinator sees flows through [`ErrorTracker::record_error`]
//! so that threshold and blacklist decisions are made in one place.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::analyzer::{analyze, classify_error, status_for, ErrorAnalysis, ErrorType};
use super::recovery::{RecoveryManager, RecoveryOutcome};
use crate::config::{ErrorConfig, RecoveryConfig};
use crate::models::{DeviceState, DeviceStatus, Frequency, RecoveryPhase};

/// Span of the rolling failures-per-minute window
pub const FAILURE_WINDOW: Duration = Duration::from_secs(60);

/// Maximum number of error records kept for diagnostics
const MAX_HISTORY: usize = 10;

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub frequency: Option<Frequency>,
    pub operation: Option<String>,
}

impl ErrorContext {
    pub fn new(frequency: Option<Frequency>, operation: impl Into<String>) -> Self {
        Self {
            frequency,
            operation: Some(operation.into()),
        }
    }
}

/// Record of a single error
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub message: String,
    pub context: ErrorContext,
}

#[derive(Debug)]
pub struct ErrorTracker {
    config: ErrorConfig,
    consecutive_errors: u32,
    frequency_errors: HashMap<u64, u32>,
    failure_window: VecDeque<Instant>,
    device: DeviceState,
    recovery: RecoveryManager,
    history: VecDeque<ErrorRecord>,
}

impl ErrorTracker {
    pub fn new(config: ErrorConfig, recovery: RecoveryConfig) -> Self {
        Self {
            config,
            consecutive_errors: 0,
            frequency_errors: HashMap::new(),
            failure_window: VecDeque::new(),
            device: DeviceState::default(),
            recovery: RecoveryManager::new(recovery),
            history: VecDeque::with_capacity(MAX_HISTORY),
        }
    }

    /// Record a failure and return its analysis.
    pub fn record_error(&mut self, message: &str, context: &ErrorContext) -> ErrorAnalysis {
        self.record_error_at(message, context, Instant::now())
    }

    pub fn record_error_at(
        &mut self,
        message: &str,
        context: &ErrorContext,
        now: Instant,
    ) -> ErrorAnalysis {
        self.consecutive_errors += 1;
        self.failure_window.push_back(now);
        self.prune_window(now);

        if let Some(frequency) = context.frequency {
            *self.frequency_errors.entry(frequency.hz()).or_insert(0) += 1;
        }

        let error_type = classify_error(message);
        if error_type == ErrorType::DeviceBusy {
            self.device.consecutive_busy += 1;
        } else {
            self.device.consecutive_busy = 0;
        }

        match status_for(error_type) {
            Some(status) => self.device.status = status,
            None if self.consecutive_errors > 3 => self.device.status = DeviceStatus::Stuck,
            None => {}
        }

        self.history.push_back(ErrorRecord {
            timestamp: Utc::now(),
            error_type,
            message: message.to_string(),
            context: context.clone(),
        });
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        analyze(
            error_type,
            self.consecutive_errors,
            self.device.consecutive_busy,
        )
    }

    /// A healthy sample arrived: clear counters and any recovery in progress.
    ///
    /// The rolling failure window is left alone so a flapping device still trips
    /// the failures-per-minute guard.
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.frequency_errors.clear();
        self.device.consecutive_busy = 0;
        self.device.status = DeviceStatus::Available;
        self.device.last_success = Some(Utc::now());
        self.recovery.reset();
        self.device.recovery = RecoveryPhase::None;
    }

    fn prune_window(&mut self, now: Instant) {
        while let Some(&oldest) = self.failure_window.front() {
            if now.saturating_duration_since(oldest) > FAILURE_WINDOW {
                self.failure_window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Failures recorded within the last minute as of `now`
    pub fn recent_failures_at(&self, now: Instant) -> u32 {
        self.failure_window
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) <= FAILURE_WINDOW)
            .count() as u32
    }

    pub fn recent_failures(&self) -> u32 {
        self.recent_failures_at(Instant::now())
    }

    pub fn has_max_consecutive_errors(&self) -> bool {
        self.consecutive_errors >= self.config.max_consecutive_errors
    }

    pub fn has_max_failures_per_minute(&self) -> bool {
        self.has_max_failures_per_minute_at(Instant::now())
    }

    pub fn has_max_failures_per_minute_at(&self, now: Instant) -> bool {
        self.recent_failures_at(now) >= self.config.max_failures_per_minute
    }

    pub fn should_blacklist_frequency(&self, frequency: Frequency) -> bool {
        self.frequency_errors(frequency) >= self.config.blacklist_threshold
    }

    pub fn frequency_errors(&self, frequency: Frequency) -> u32 {
        self.frequency_errors
            .get(&frequency.hz())
            .copied()
            .unwrap_or(0)
    }

    pub fn should_attempt_recovery(&self) -> bool {
        self.recovery
            .should_attempt(self.consecutive_errors, self.device.status)
    }

    pub fn should_attempt_recovery_at(&self, now: Instant) -> bool {
        self.recovery
            .should_attempt_at(self.consecutive_errors, self.device.status, now)
    }

    pub fn start_recovery(&mut self) -> RecoveryPhase {
        let phase = self.recovery.start();
        self.device.recovery = phase;
        phase
    }

    /// Finish a recovery attempt; success clears the error state.
    pub fn complete_recovery(&mut self, success: bool) -> RecoveryOutcome {
        let outcome = self.recovery.complete(success);
        if success {
            self.consecutive_errors = 0;
            self.frequency_errors.clear();
            self.device.consecutive_busy = 0;
            self.device.status = DeviceStatus::Available;
        }
        self.device.recovery = self.recovery.phase();
        outcome
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn is_recovering(&self) -> bool {
        self.recovery.is_recovering()
    }

    pub fn recovery_exhausted(&self) -> bool {
        self.recovery.is_exhausted()
    }

    /// 0-100 health estimate; lower is worse.
    pub fn health_score(&self) -> f64 {
        self.health_score_at(Instant::now())
    }

    pub fn health_score_at(&self, now: Instant) -> f64 {
        let consecutive =
            f64::from(self.consecutive_errors) / f64::from(self.config.max_consecutive_errors);
        let recent = f64::from(self.recent_failures_at(now))
            / f64::from(self.config.max_failures_per_minute);
        let score = 100.0 - 40.0 * consecutive - 30.0 * recent - self.device.status.penalty();
        score.clamp(0.0, 100.0)
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn device_state(&self) -> &DeviceState {
        &self.device
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.device.status
    }

    /// Most recent errors, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.history.iter()
    }

    /// Forget everything, including the failure window and recovery state.
    pub fn reset(&mut self) {
        self.consecutive_errors = 0;
        self.frequency_errors.clear();
        self.failure_window.clear();
        self.device.reset();
        self.recovery.reset();
        self.history.clear();
    }
}

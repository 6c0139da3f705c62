//! Recovery manager: bounds and paces automatic kill-and-respawn attempts.

use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;
use crate::models::{DeviceStatus, RecoveryPhase};

/// What the caller should do after an attempt finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovered,
    RetryAfterDelay(Duration),
    GiveUp,
}

#[derive(Debug)]
pub struct RecoveryManager {
    config: RecoveryConfig,
    attempts: u32,
    last_attempt: Option<Instant>,
    is_recovering: bool,
    phase: RecoveryPhase,
}

impl RecoveryManager {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            attempts: 0,
            last_attempt: None,
            is_recovering: false,
            phase: RecoveryPhase::None,
        }
    }

    /// Whether a new attempt may start now.
    pub fn should_attempt(&self, consecutive_errors: u32, status: DeviceStatus) -> bool {
        self.should_attempt_at(consecutive_errors, status, Instant::now())
    }

    pub fn should_attempt_at(
        &self,
        consecutive_errors: u32,
        status: DeviceStatus,
        now: Instant,
    ) -> bool {
        if self.is_recovering || self.is_exhausted() || self.in_cooldown_at(now) {
            return false;
        }
        consecutive_errors >= 2 || matches!(status, DeviceStatus::Busy | DeviceStatus::Stuck)
    }

    /// Begin an attempt; returns the phase it runs in.
    pub fn start(&mut self) -> RecoveryPhase {
        self.start_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) -> RecoveryPhase {
        self.attempts += 1;
        self.last_attempt = Some(now);
        self.is_recovering = true;
        self.phase = if self.attempts >= self.config.escalation_threshold {
            RecoveryPhase::Escalating
        } else {
            RecoveryPhase::Retrying
        };
        self.phase
    }

    /// Finish the running attempt.
    pub fn complete(&mut self, success: bool) -> RecoveryOutcome {
        if success {
            self.reset();
            return RecoveryOutcome::Recovered;
        }

        self.is_recovering = false;
        self.phase = RecoveryPhase::CoolingDown;
        if self.is_exhausted() {
            RecoveryOutcome::GiveUp
        } else {
            RecoveryOutcome::RetryAfterDelay(self.cooldown())
        }
    }

    /// Cooldown after an attempt; longer once attempts have escalated.
    pub fn cooldown(&self) -> Duration {
        if self.attempts >= self.config.escalation_threshold {
            self.config.cooldown_period()
        } else {
            self.config.recovery_delay()
        }
    }

    fn in_cooldown_at(&self, now: Instant) -> bool {
        self.last_attempt
            .is_some_and(|last| now.saturating_duration_since(last) < self.cooldown())
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_recovery_attempts
    }

    pub fn is_recovering(&self) -> bool {
        self.is_recovering
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_recovery_attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
        self.is_recovering = false;
        self.phase = RecoveryPhase::None;
    }
}

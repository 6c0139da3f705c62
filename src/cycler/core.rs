//! Timer-driven walk over the configured frequency list.
//!
//! Moving to the next frequency is two-phase: the cycle timer advances the
//! index and marks the cycler in transition, then the switch timer ends the
//! transition once the device has had time to settle.

use std::time::Duration;

use super::blacklist::FrequencyBlacklist;
use crate::error::{Result, SweepError};
use crate::models::{normalize_frequencies, CycleConfigEvent, Frequency, FrequencyInput};
use crate::orchestrator::scheduler::{Scheduler, TimerHandle, TimerKind};

pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(10_000);
const MIN_SWITCHING_TIME: Duration = Duration::from_millis(500);
const MAX_SWITCHING_TIME: Duration = Duration::from_millis(3000);

/// A quarter of the dwell, bounded to 0.5-3 s.
pub fn default_switching_time(cycle_time: Duration) -> Duration {
    cycle_time
        .mul_f64(0.25)
        .clamp(MIN_SWITCHING_TIME, MAX_SWITCHING_TIME)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub frequencies: Vec<Frequency>,
    pub cycle_time: Duration,
    pub switching_time: Duration,
}

impl CycleConfig {
    pub fn new(
        frequencies: Vec<Frequency>,
        cycle_time: Duration,
        switching_time: Option<Duration>,
    ) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(SweepError::InvalidFrequencies(
                "no valid frequencies provided".into(),
            ));
        }
        if cycle_time.is_zero() {
            return Err(SweepError::InvalidFrequencies(
                "cycle time must be greater than zero".into(),
            ));
        }
        Ok(Self {
            frequencies,
            cycle_time,
            switching_time: switching_time.unwrap_or_else(|| default_switching_time(cycle_time)),
        })
    }

    /// Normalize caller-supplied frequency shapes, dropping unusable entries.
    pub fn from_inputs(
        inputs: &[FrequencyInput],
        cycle_time: Duration,
        switching_time: Option<Duration>,
    ) -> Result<Self> {
        Self::new(normalize_frequencies(inputs), cycle_time, switching_time)
    }

    /// Timer-driven advance only happens with more than one frequency.
    pub fn is_cycling(&self) -> bool {
        self.frequencies.len() > 1
    }

    /// Time to visit every frequency once
    pub fn total_cycle_time(&self) -> Duration {
        if !self.is_cycling() {
            return self.cycle_time;
        }
        let n = self.frequencies.len() as u32;
        (self.cycle_time + self.switching_time) * n
    }

    pub fn to_event(&self) -> CycleConfigEvent {
        CycleConfigEvent {
            frequencies: self.frequencies.clone(),
            cycle_time_ms: self.cycle_time.as_millis() as u64,
            switching_time_ms: self.switching_time.as_millis() as u64,
            total_cycle_ms: self.total_cycle_time().as_millis() as u64,
            is_cycling: self.is_cycling(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleState {
    pub current_index: usize,
    pub is_cycling: bool,
    /// Set only between advancing and the end of the switch window
    pub in_transition: bool,
    pub cycle_timer: Option<TimerHandle>,
    pub switch_timer: Option<TimerHandle>,
}

#[derive(Debug, Default)]
pub struct FrequencyCycler {
    config: Option<CycleConfig>,
    state: CycleState,
    current: Option<Frequency>,
    blacklist: FrequencyBlacklist,
}

impl FrequencyCycler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new frequency plan. The blacklist starts empty for each plan.
    ///
    /// Callers must have stopped any previous plan so no timers are left armed.
    pub fn initialize(&mut self, config: CycleConfig) -> &CycleConfig {
        self.state = CycleState {
            is_cycling: config.is_cycling(),
            ..CycleState::default()
        };
        self.current = config.frequencies.first().copied();
        self.blacklist.clear();
        self.config.insert(config)
    }

    pub fn config(&self) -> Option<&CycleConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn current(&self) -> Option<Frequency> {
        self.current
    }

    /// The frequency a cycle advance would move to
    pub fn next(&self) -> Option<Frequency> {
        let index = self.next_active_index(self.state.current_index)?;
        self.config.as_ref().map(|c| c.frequencies[index])
    }

    fn next_active_index(&self, from: usize) -> Option<usize> {
        let frequencies = &self.config.as_ref()?.frequencies;
        let n = frequencies.len();
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|&i| !self.blacklist.contains(frequencies[i]))
    }

    pub fn is_cycling(&self) -> bool {
        self.state.is_cycling
    }

    pub fn in_transition(&self) -> bool {
        self.state.in_transition
    }

    /// Arm the dwell timer for the current frequency.
    ///
    /// Returns the frequency the dwell started on, or `None` in
    /// single-frequency mode where nothing is armed.
    pub fn start_automatic_cycling(&mut self, scheduler: &mut Scheduler) -> Option<Frequency> {
        if !self.state.is_cycling {
            return None;
        }
        let cycle_time = self.config.as_ref()?.cycle_time;
        if let Some(handle) = self.state.cycle_timer.take() {
            scheduler.cancel(handle);
        }
        self.state.cycle_timer = Some(scheduler.schedule(TimerKind::Cycle, cycle_time));
        self.current
    }

    /// Advance to the next usable frequency and arm the switch timer.
    ///
    /// Returns `None` when not cycling or when every frequency is blacklisted.
    pub fn cycle_to_next(&mut self, scheduler: &mut Scheduler) -> Option<Frequency> {
        if !self.state.is_cycling {
            return None;
        }
        if let Some(handle) = self.state.cycle_timer.take() {
            scheduler.cancel(handle);
        }
        let index = self.next_active_index(self.state.current_index)?;
        let config = self.config.as_ref()?;
        let next = config.frequencies[index];
        let switching_time = config.switching_time;

        self.state.in_transition = true;
        self.state.current_index = index;
        self.current = Some(next);

        if let Some(handle) = self.state.switch_timer.take() {
            scheduler.cancel(handle);
        }
        self.state.switch_timer = Some(scheduler.schedule(TimerKind::Switch, switching_time));
        Some(next)
    }

    /// The switch window ended; returns the frequency to run next.
    pub fn complete_switch(&mut self) -> Option<Frequency> {
        self.state.in_transition = false;
        self.state.switch_timer = None;
        self.current
    }

    pub fn is_cycle_timer(&self, handle: TimerHandle) -> bool {
        self.state.cycle_timer == Some(handle)
    }

    pub fn is_switch_timer(&self, handle: TimerHandle) -> bool {
        self.state.switch_timer == Some(handle)
    }

    /// Returns true if the frequency was newly blacklisted.
    pub fn blacklist_frequency(&mut self, frequency: Frequency) -> bool {
        self.blacklist.add(frequency)
    }

    pub fn is_blacklisted(&self, frequency: Frequency) -> bool {
        self.blacklist.contains(frequency)
    }

    pub fn blacklist(&self) -> &FrequencyBlacklist {
        &self.blacklist
    }

    /// True once every configured frequency is blacklisted
    pub fn all_blacklisted(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.frequencies.iter().all(|f| self.blacklist.contains(*f)))
    }

    /// Position in the current cycle, 0-100
    pub fn progress(&self) -> Option<f64> {
        let n = self.config.as_ref()?.frequencies.len();
        Some((self.state.current_index + 1) as f64 * 100.0 / n as f64)
    }

    /// Cancel both timers without leaving cycling mode.
    pub fn cancel_timers(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.state.cycle_timer.take() {
            scheduler.cancel(handle);
        }
        if let Some(handle) = self.state.switch_timer.take() {
            scheduler.cancel(handle);
        }
        self.state.in_transition = false;
    }

    pub fn stop_cycling(&mut self, scheduler: &mut Scheduler) {
        self.cancel_timers(scheduler);
        self.state.is_cycling = false;
    }

    pub fn emergency_stop(&mut self, scheduler: &mut Scheduler) {
        self.stop_cycling(scheduler);
    }

    /// Stop and rewind to the first frequency.
    pub fn reset_cycling(&mut self, scheduler: &mut Scheduler) {
        self.stop_cycling(scheduler);
        self.state.current_index = 0;
        self.current = self.config.as_ref().and_then(|c| c.frequencies.first().copied());
    }

    /// Drop the plan entirely.
    pub fn clear(&mut self, scheduler: &mut Scheduler) {
        self.cancel_timers(scheduler);
        self.state = CycleState::default();
        self.config = None;
        self.current = None;
        self.blacklist.clear();
    }
}

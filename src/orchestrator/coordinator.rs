//! Sweep coordinator: the Idle/Running/Recovering/Stopping state machine.
//!
//! The coordinator is single-threaded. Commands, process output and timer
//! expiries all arrive through `&mut self`, so no state here is shared.
//! Output from the process is tagged with a spawn generation; anything from a
//! generation other than the live process is dropped.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::args::{build_sweep_args, validate_center};
use super::events::EventBus;
use super::request::SweepRequest;
use super::resource::HardwareResource;
use super::scheduler::{Scheduler, TimerHandle, TimerKind};
use crate::buffer::{validate, BufferManager, ParsedLine};
use crate::config::SweepdConfig;
use crate::cycler::{CycleConfig, FrequencyCycler};
use crate::error::{ErrorKind, Result, SweepError};
use crate::models::{
    ErrorEvent, Frequency, HealthReport, Sample, StatusChange, StatusSnapshot, SweepEvent,
    SweepState,
};
use crate::process::{OutputHandler, OutputKind, ProcessControl, ProcessOutput, ProcessState};
use crate::tracker::{is_error_line, ErrorContext, ErrorTracker, ErrorType, RecoveryOutcome};

/// Stderr lines kept for classifying an exit
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Clone, Default)]
struct SweepStats {
    sweeps_started: u64,
    sweeps_completed: u64,
    samples_emitted: u64,
    start_time: Option<DateTime<Utc>>,
}

/// A failure routed through the error path
struct Failure {
    message: String,
    kind: ErrorKind,
    operation: &'static str,
    /// The sweep process is gone (exit, failed spawn, failed health check)
    process_gone: bool,
}

pub struct SweepCoordinator {
    config: SweepdConfig,
    control: Arc<dyn ProcessControl>,
    output_sink: OutputHandler,
    events: EventBus,
    scheduler: Scheduler,
    cycler: FrequencyCycler,
    buffer: BufferManager,
    tracker: ErrorTracker,
    resource: HardwareResource,
    state: SweepState,
    process: Option<ProcessState>,
    generation: u64,
    health_timer: Option<TimerHandle>,
    recovery_timer: Option<TimerHandle>,
    settle_timer: Option<TimerHandle>,
    last_data: Option<Instant>,
    stderr_tail: VecDeque<String>,
    stats: SweepStats,
}

impl SweepCoordinator {
    /// `output_sink` must hand process output back to this coordinator via
    /// [`SweepCoordinator::handle_output`].
    pub fn new(
        config: SweepdConfig,
        control: Arc<dyn ProcessControl>,
        output_sink: OutputHandler,
        events: EventBus,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(),
            cycler: FrequencyCycler::new(),
            buffer: BufferManager::new(config.buffer.clone()),
            tracker: ErrorTracker::new(config.errors.clone(), config.recovery.clone()),
            resource: HardwareResource::new(&config.resource),
            config,
            control,
            output_sink,
            events,
            state: SweepState::Idle,
            process: None,
            generation: 0,
            health_timer: None,
            recovery_timer: None,
            settle_timer: None,
            last_data: None,
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL_LINES),
            stats: SweepStats::default(),
        }
    }

    // ---- commands -------------------------------------------------------

    /// Begin a sweep. Every rejection is also published as an `error` event.
    pub fn start(&mut self, request: &SweepRequest) -> Result<StatusSnapshot> {
        if self.state == SweepState::Stopping {
            debug!("start requested while stop is settling, finishing stop");
            self.finish_stop();
        }

        if self.state.is_active() {
            if !self.is_stale() {
                return self.reject(SweepError::AlreadyRunning);
            }
            warn!(
                pid = ?self.process.as_ref().map(|p| p.pid),
                "sweep marked running but its process is gone, resetting"
            );
            self.teardown(false);
            self.state = SweepState::Idle;
        }

        let cycle_time = request.cycle_time_or(self.config.sweep.default_cycle_time_ms);
        let plan = match CycleConfig::from_inputs(
            &request.frequency_inputs(),
            cycle_time,
            request.switching_time(),
        ) {
            Ok(plan) => plan,
            Err(e) => return self.reject(e),
        };
        for frequency in &plan.frequencies {
            if let Err(e) = validate_center(*frequency, &self.config.sweep) {
                return self.reject(e);
            }
        }

        if let Err(e) = self.resource.acquire() {
            return self.reject(e);
        }

        self.tracker.reset();
        self.buffer.reset();
        self.stderr_tail.clear();
        self.stats = SweepStats {
            start_time: Some(Utc::now()),
            ..SweepStats::default()
        };
        let cycle_event = self.cycler.initialize(plan).to_event();
        self.state = SweepState::Running;
        info!(
            frequencies = cycle_event.frequencies.len(),
            cycling = cycle_event.is_cycling,
            "sweep started"
        );

        self.publish_status();
        self.events.publish(SweepEvent::CycleConfig(cycle_event));
        self.schedule_health(self.config.health.interval());
        self.run_next_frequency();
        Ok(self.status())
    }

    /// Cooperative stop. A no-op when nothing is running.
    pub fn stop(&mut self) -> StatusSnapshot {
        if matches!(self.state, SweepState::Idle | SweepState::Stopping) {
            return self.status();
        }

        info!("stopping sweep");
        self.state = SweepState::Stopping;
        self.publish_status();
        self.teardown(false);
        self.settle_timer = Some(self.scheduler.schedule(
            TimerKind::StopSettle,
            Duration::from_millis(self.config.coordinator.stop_settle_ms),
        ));
        self.status()
    }

    /// Kill everything now and go straight to Idle. Safe from any state.
    pub fn emergency_stop(&mut self) -> StatusSnapshot {
        let was_idle = self.state == SweepState::Idle;
        warn!(state = ?self.state, "emergency stop");
        self.teardown(true);
        self.state = SweepState::Idle;
        if !was_idle {
            self.publish_status();
            self.events
                .publish(SweepEvent::status_change(StatusChange::EmergencyStopped));
        }
        self.status()
    }

    /// Emergency stop, then kill stray sweep binaries system-wide.
    pub fn force_cleanup(&mut self) -> StatusSnapshot {
        let status = self.emergency_stop();
        if let Err(e) = self.control.cleanup_orphans() {
            warn!(error = %e, "system-wide cleanup failed");
        }
        status
    }

    pub fn status(&self) -> StatusSnapshot {
        let active = self.state.is_active();
        StatusSnapshot {
            state: self.state,
            current_frequency_hz: self
                .cycler
                .current()
                .filter(|_| active)
                .map(|f| f.hz()),
            progress: self.cycler.progress().filter(|_| active),
            total_sweeps: self.stats.sweeps_started,
            completed_sweeps: self.stats.sweeps_completed,
            start_time: self.stats.start_time.filter(|_| active),
            is_cycling: active && self.cycler.is_cycling(),
            health_score: self.tracker.health_score(),
            device_status: self.tracker.device_status(),
            timestamp: Utc::now(),
        }
    }

    /// Hardware health. While sweeping the live process answers for the
    /// device; otherwise the info probe runs.
    pub fn check_health(&self) -> HealthReport {
        if self.state.is_active() {
            let alive = self
                .process
                .as_ref()
                .is_some_and(|p| self.control.is_alive(p));
            return HealthReport {
                connected: alive,
                device_info: None,
                error: (!alive).then(|| "sweep process is not running".to_string()),
                last_update: Utc::now(),
            };
        }

        let report = self.control.test_availability();
        let connected = report.is_available();
        HealthReport {
            connected,
            device_info: report.device_info,
            error: (!connected).then(|| format!("{}: {}", report.availability, report.reason)),
            last_update: Utc::now(),
        }
    }

    // ---- inputs from the service loop ------------------------------------

    pub fn handle_output(&mut self, output: ProcessOutput) {
        let live = self.process.as_ref().map(|p| p.generation);
        if live != Some(output.generation) {
            debug!(
                generation = output.generation,
                ?live,
                "dropping output from a stale process"
            );
            return;
        }

        match output.kind {
            OutputKind::Stdout(bytes) => self.on_stdout(&bytes),
            OutputKind::Stderr(line) => self.on_stderr(line),
            OutputKind::Exited { code, signal } => self.on_exit(code, signal),
        }
    }

    /// Fire every timer due at `now`.
    pub fn on_tick(&mut self, now: Instant) {
        for (handle, kind) in self.scheduler.due(now) {
            match kind {
                TimerKind::Cycle => self.on_cycle_timer(handle),
                TimerKind::Switch => self.on_switch_timer(handle),
                TimerKind::HealthCheck => self.on_health_timer(handle),
                TimerKind::RecoveryRespawn | TimerKind::RecoveryRetry => {
                    self.on_recovery_timer(handle, kind)
                }
                TimerKind::StopSettle => self.on_settle_timer(handle),
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    // ---- accessors ---------------------------------------------------------

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn cycler(&self) -> &FrequencyCycler {
        &self.cycler
    }

    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    pub fn resource_held(&self) -> bool {
        self.resource.is_held()
    }

    pub fn current_process(&self) -> Option<&ProcessState> {
        self.process.as_ref()
    }

    /// Timers currently armed across the cycler and coordinator
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    // ---- process lifecycle --------------------------------------------------

    /// Spawn the process for the current frequency, routing a failure into
    /// the error path.
    fn run_next_frequency(&mut self) {
        if let Err(e) = self.spawn_current() {
            error!(error = %e, "failed to start sweep process");
            self.handle_failure(Failure {
                message: e.to_string(),
                kind: e.kind(),
                operation: "spawn",
                process_gone: true,
            });
        }
    }

    fn spawn_current(&mut self) -> Result<()> {
        let frequency = self
            .cycler
            .current()
            .ok_or_else(|| SweepError::InvalidFrequencies("no frequency to sweep".into()))?;
        let args = build_sweep_args(frequency, &self.config.sweep)?;

        self.generation += 1;
        let process = self
            .control
            .spawn(&args, self.generation, Arc::clone(&self.output_sink))?;
        info!(
            pid = process.pid,
            frequency_mhz = frequency.mhz(),
            "sweeping"
        );

        self.process = Some(process);
        self.stats.sweeps_started += 1;
        self.last_data = Some(Instant::now());
        self.stderr_tail.clear();
        self.cycler.start_automatic_cycling(&mut self.scheduler);
        Ok(())
    }

    /// Stop the live process, logging instead of failing.
    fn stop_process(&mut self) {
        if let Some(process) = self.process.take() {
            if let Err(e) = self.control.stop(&process) {
                warn!(pid = process.pid, error = %e, "failed to stop sweep process");
            }
        }
    }

    /// Running but with a dead or missing process and nothing in flight
    fn is_stale(&self) -> bool {
        if self.state != SweepState::Running
            || self.cycler.in_transition()
            || self.tracker.is_recovering()
            || self.recovery_timer.is_some()
        {
            return false;
        }
        !self
            .process
            .as_ref()
            .is_some_and(|p| self.control.is_alive(p))
    }

    /// Release everything a run holds. Never short-circuits.
    fn teardown(&mut self, force: bool) {
        self.cycler.clear(&mut self.scheduler);
        for handle in [
            self.health_timer.take(),
            self.recovery_timer.take(),
            self.settle_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.scheduler.cancel(handle);
        }
        self.scheduler.clear();

        if force {
            self.process = None;
            if let Err(e) = self.control.force_kill() {
                warn!(error = %e, "force kill failed");
            }
        } else {
            self.stop_process();
        }

        self.buffer.clear();
        self.stderr_tail.clear();
        self.tracker.reset();
        self.last_data = None;
        self.resource.release();
    }

    fn finish_stop(&mut self) {
        if let Some(handle) = self.settle_timer.take() {
            self.scheduler.cancel(handle);
        }
        self.state = SweepState::Idle;
        info!("sweep stopped");
        self.publish_status();
        self.events
            .publish(SweepEvent::status_change(StatusChange::Stopped));
    }

    /// Publish a terminal error, then stop.
    fn fatal_stop(&mut self, kind: ErrorKind, message: String) {
        error!(%message, "stopping sweep");
        self.publish_error(ErrorEvent::new(kind, message));
        self.stop();
    }

    // ---- process output -----------------------------------------------------

    fn on_stdout(&mut self, bytes: &[u8]) {
        if self.state != SweepState::Running || self.cycler.in_transition() {
            return;
        }
        let mut samples = Vec::new();
        self.buffer.process_chunk(bytes, |line| {
            if let ParsedLine::Sample(sample) = line {
                samples.push(sample);
            }
        });
        for sample in samples {
            self.emit_sample(sample);
        }
    }

    fn emit_sample(&mut self, sample: Sample) {
        let now = Utc::now();
        for issue in validate(&sample, now) {
            debug!(%issue, center_mhz = sample.center_freq_mhz(), "sample failed validation");
        }

        self.last_data = Some(Instant::now());
        self.tracker.record_success();
        self.stats.samples_emitted += 1;
        self.events.publish(SweepEvent::SpectrumData {
            frequency: sample.center_freq_mhz(),
            power: sample.peak_power(),
            data: sample,
            timestamp: now,
        });
    }

    fn on_stderr(&mut self, line: String) {
        if self.stderr_tail.len() == STDERR_TAIL_LINES {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line.clone());

        if is_error_line(&line) {
            warn!(%line, "sweep process reported an error");
            self.handle_failure(Failure {
                message: line,
                kind: ErrorKind::Hardware,
                operation: "sweep",
                process_gone: false,
            });
        } else {
            debug!(%line, "sweep stderr");
        }
    }

    fn on_exit(&mut self, code: Option<i32>, signal: Option<i32>) {
        self.process = None;
        if self.state != SweepState::Running || self.cycler.in_transition() {
            debug!(?code, ?signal, state = ?self.state, "sweep process exited");
            return;
        }

        let status = match (code, signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("signal {signal}"),
            (None, None) => "unknown status".to_string(),
        };
        let message = match self.stderr_tail.iter().rev().find(|l| is_error_line(l)) {
            Some(line) => format!("sweep process exited ({status}): {line}"),
            None => format!("sweep process exited unexpectedly ({status})"),
        };
        self.handle_failure(Failure {
            message,
            kind: ErrorKind::ProcessExit,
            operation: "process_exit",
            process_gone: true,
        });
    }

    // ---- error path ---------------------------------------------------------

    fn handle_failure(&mut self, failure: Failure) {
        if self.state != SweepState::Running {
            return;
        }

        let frequency = self.cycler.current();
        let analysis = self.tracker.record_error(
            &failure.message,
            &ErrorContext::new(frequency, failure.operation),
        );
        let newly_blacklisted = self.blacklist_if_failing(frequency);

        let kind = if analysis.error_type == ErrorType::PermissionDenied {
            ErrorKind::Permission
        } else {
            failure.kind
        };
        self.publish_error(ErrorEvent::new(kind, &failure.message).with_details(json!({
            "errorType": analysis.error_type,
            "severity": analysis.severity,
            "recoverable": analysis.is_recoverable,
            "recommendedAction": analysis.recommended_action,
            "consecutiveErrors": self.tracker.consecutive_errors(),
            "frequencyHz": frequency.map(|f| f.hz()),
            "operation": failure.operation,
        })));

        if self.stop_on_error_limits() {
            return;
        }

        if let Some(frequency) = newly_blacklisted {
            self.publish_blacklisted(frequency);
            if self.switch_from_blacklisted() {
                return;
            }
        }

        if !analysis.is_recoverable {
            return;
        }

        let wants_recovery = failure.process_gone || analysis.requires_restart;
        if wants_recovery && self.tracker.should_attempt_recovery() {
            self.begin_recovery(&failure.message);
        } else if failure.process_gone && self.tracker.recovery_exhausted() {
            let message = format!(
                "recovery gave up after {} attempts",
                self.tracker.recovery().attempts()
            );
            self.fatal_stop(ErrorKind::Recovery, message);
        } else if failure.process_gone {
            // Look again soon rather than waiting a full interval
            self.schedule_health(self.config.recovery.recovery_delay());
        }
    }

    /// Stop the sweep once the error-rate limits are hit; true if stopped.
    fn stop_on_error_limits(&mut self) -> bool {
        if !self.tracker.has_max_consecutive_errors() && !self.tracker.has_max_failures_per_minute()
        {
            return false;
        }
        let message = format!(
            "too many sweep errors ({} consecutive, {} in the last minute)",
            self.tracker.consecutive_errors(),
            self.tracker.recent_failures()
        );
        self.fatal_stop(ErrorKind::Fatal, message);
        true
    }

    /// Blacklist `frequency` once it has failed often enough.
    fn blacklist_if_failing(&mut self, frequency: Option<Frequency>) -> Option<Frequency> {
        let f = frequency?;
        (self.tracker.should_blacklist_frequency(f) && self.cycler.blacklist_frequency(f))
            .then_some(f)
    }

    fn publish_blacklisted(&mut self, frequency: Frequency) {
        warn!(frequency_mhz = frequency.mhz(), "frequency blacklisted");
        self.publish_error(ErrorEvent::new(
            ErrorKind::Blacklist,
            format!(
                "{frequency} blacklisted after {} errors",
                self.tracker.frequency_errors(frequency)
            ),
        ));
    }

    /// Move off a blacklisted frequency when another one is still usable.
    ///
    /// Returns false when there is nowhere to go; the caller keeps handling
    /// the failure on the current frequency.
    fn switch_from_blacklisted(&mut self) -> bool {
        if !self.cycler.is_cycling() || self.cycler.all_blacklisted() {
            return false;
        }
        self.advance_frequency();
        true
    }

    // ---- recovery -----------------------------------------------------------

    fn begin_recovery(&mut self, reason: &str) {
        let phase = self.tracker.start_recovery();
        let attempt = self.tracker.recovery().attempts();
        warn!(attempt, ?phase, %reason, "starting recovery");

        self.state = SweepState::Recovering;
        self.cycler.cancel_timers(&mut self.scheduler);
        self.events.publish(SweepEvent::RecoveryStart {
            attempt,
            phase,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        self.publish_status();

        self.stop_process();
        self.buffer.clear();
        self.stderr_tail.clear();
        self.set_recovery_timer(TimerKind::RecoveryRespawn, self.config.recovery.settle_delay());
    }

    fn set_recovery_timer(&mut self, kind: TimerKind, delay: Duration) {
        if let Some(handle) = self.recovery_timer.take() {
            self.scheduler.cancel(handle);
        }
        self.recovery_timer = Some(self.scheduler.schedule(kind, delay));
    }

    fn on_recovery_timer(&mut self, handle: TimerHandle, kind: TimerKind) {
        if self.recovery_timer != Some(handle) {
            return;
        }
        self.recovery_timer = None;
        if self.state != SweepState::Recovering {
            return;
        }

        if kind == TimerKind::RecoveryRetry {
            self.begin_recovery("retrying after a failed recovery attempt");
            return;
        }

        let attempt = self.tracker.recovery().attempts();
        match self.spawn_current() {
            Ok(()) => {
                self.tracker.complete_recovery(true);
                self.state = SweepState::Running;
                info!(attempt, "recovery succeeded");
                self.events.publish(SweepEvent::RecoveryComplete {
                    attempt,
                    success: true,
                    timestamp: Utc::now(),
                });
                self.publish_status();
                self.events
                    .publish(SweepEvent::status_change(StatusChange::Running));
            }
            Err(e) => {
                warn!(attempt, error = %e, "recovery respawn failed");
                let frequency = self.cycler.current();
                self.tracker
                    .record_error(&e.to_string(), &ErrorContext::new(frequency, "recovery"));
                let newly_blacklisted = self.blacklist_if_failing(frequency);
                let outcome = self.tracker.complete_recovery(false);
                self.events.publish(SweepEvent::RecoveryComplete {
                    attempt,
                    success: false,
                    timestamp: Utc::now(),
                });
                if self.stop_on_error_limits() {
                    return;
                }
                if let Some(frequency) = newly_blacklisted {
                    self.publish_blacklisted(frequency);
                    // The next attempt respawns on the new frequency; the
                    // recovery delay doubles as the switch window.
                    if self.cycler.is_cycling() && !self.cycler.all_blacklisted() {
                        self.cycler.cycle_to_next(&mut self.scheduler);
                        self.cycler.cancel_timers(&mut self.scheduler);
                    }
                }
                match outcome {
                    RecoveryOutcome::GiveUp => self.fatal_stop(
                        ErrorKind::Recovery,
                        format!("recovery gave up after {attempt} attempts: {e}"),
                    ),
                    RecoveryOutcome::RetryAfterDelay(delay) => {
                        self.set_recovery_timer(TimerKind::RecoveryRetry, delay)
                    }
                    RecoveryOutcome::Recovered => self.state = SweepState::Running,
                }
            }
        }
    }

    // ---- timers -------------------------------------------------------------

    fn on_cycle_timer(&mut self, handle: TimerHandle) {
        if !self.cycler.is_cycle_timer(handle) || self.state != SweepState::Running {
            return;
        }
        self.advance_frequency();
    }

    /// First half of a frequency switch: tear down and let the device settle.
    fn advance_frequency(&mut self) {
        let Some(next) = self.cycler.cycle_to_next(&mut self.scheduler) else {
            debug!("no usable frequency to switch to, staying put");
            return;
        };
        info!(frequency_mhz = next.mhz(), "switching frequency");
        self.events
            .publish(SweepEvent::status_change(StatusChange::Switching));
        self.stop_process();
        self.buffer.clear();
        self.stderr_tail.clear();
    }

    fn on_switch_timer(&mut self, handle: TimerHandle) {
        if !self.cycler.is_switch_timer(handle) {
            return;
        }
        self.cycler.complete_switch();
        if self.state != SweepState::Running {
            return;
        }
        self.stats.sweeps_completed += 1;
        self.publish_status();
        self.run_next_frequency();
        if self.process.is_some() {
            self.events
                .publish(SweepEvent::status_change(StatusChange::Running));
        }
    }

    fn schedule_health(&mut self, delay: Duration) {
        if let Some(handle) = self.health_timer.take() {
            self.scheduler.cancel(handle);
        }
        self.health_timer = Some(self.scheduler.schedule(TimerKind::HealthCheck, delay));
    }

    fn on_health_timer(&mut self, handle: TimerHandle) {
        if self.health_timer != Some(handle) {
            return;
        }
        self.health_timer = None;
        if !self.state.is_active() {
            return;
        }
        self.schedule_health(self.config.health.interval());

        if self.state != SweepState::Running
            || self.cycler.in_transition()
            || self.tracker.is_recovering()
        {
            return;
        }

        let alive = self
            .process
            .as_ref()
            .is_some_and(|p| self.control.is_alive(p));
        let silence = self.last_data.map(|t| t.elapsed()).unwrap_or_default();

        let problem = if !alive {
            Some("health check: sweep process is not running".to_string())
        } else if silence > self.config.health.data_timeout() {
            Some(format!(
                "health check: no data for {}s",
                silence.as_secs()
            ))
        } else {
            None
        };

        match problem {
            Some(message) => {
                warn!(%message, "health check failed");
                self.stop_process();
                self.handle_failure(Failure {
                    message,
                    kind: ErrorKind::HealthCheck,
                    operation: "health_check",
                    process_gone: true,
                });
            }
            None => debug!("health check passed"),
        }
    }

    fn on_settle_timer(&mut self, handle: TimerHandle) {
        if self.settle_timer != Some(handle) {
            return;
        }
        self.settle_timer = None;
        if self.state == SweepState::Stopping {
            self.finish_stop();
        }
    }

    // ---- events -------------------------------------------------------------

    fn publish_status(&self) {
        self.events.publish(SweepEvent::Status(self.status()));
    }

    fn publish_error(&self, event: ErrorEvent) {
        self.events.publish(SweepEvent::Error(event));
    }

    fn reject<T>(&self, err: SweepError) -> Result<T> {
        warn!(error = %err, "start rejected");
        self.publish_error(ErrorEvent::new(err.kind(), err.to_string()));
        Err(err)
    }
}

impl Drop for SweepCoordinator {
    fn drop(&mut self) {
        if self.state != SweepState::Idle || self.process.is_some() {
            self.teardown(true);
        }
    }
}

//! Shared test helpers: a scripted process backend and a coordinator harness

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use sweepd::config::SweepdConfig;
use sweepd::error::{ErrorKind, Result, SweepError};
use sweepd::models::{FrequencyInput, FrequencyUnit, SweepEvent, SweepState};
use sweepd::orchestrator::{EventBus, SweepCoordinator, SweepRequest};
use sweepd::process::{
    Availability, AvailabilityReport, OutputHandler, OutputKind, ProcessControl, ProcessOutput,
    ProcessState,
};

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    spawned: Vec<Vec<String>>,
    live: HashMap<u32, ProcessState>,
    last_handler: Option<(u64, OutputHandler)>,
    failing_spawns: usize,
    always_fail_spawn: bool,
    fail_stop: bool,
    dead: bool,
    stops: usize,
    force_kills: usize,
    cleanups: usize,
}

/// Process backend that records what the coordinator asks of it
#[derive(Default)]
pub struct FakeControl {
    state: Mutex<FakeState>,
}

impl FakeControl {
    pub fn new() -> Arc<Self> {
        let control = Self::default();
        control.state.lock().unwrap().next_pid = 40_000;
        Arc::new(control)
    }

    /// Fail the next `count` spawns
    pub fn fail_next_spawns(&self, count: usize) {
        self.state.lock().unwrap().failing_spawns = count;
    }

    pub fn fail_every_spawn(&self, fail: bool) {
        self.state.lock().unwrap().always_fail_spawn = fail;
    }

    pub fn fail_stop(&self, fail: bool) {
        self.state.lock().unwrap().fail_stop = fail;
    }

    /// Make every tracked process report as dead without an exit notification
    pub fn kill_silently(&self) {
        self.state.lock().unwrap().dead = true;
    }

    pub fn spawned(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.state.lock().unwrap().spawned.len()
    }

    /// The `-f min:max` value of the most recent spawn
    pub fn last_range(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        let args = state.spawned.last()?;
        let index = args.iter().position(|a| a == "-f")?;
        args.get(index + 1).cloned()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn force_kills(&self) -> usize {
        self.state.lock().unwrap().force_kills
    }

    pub fn cleanups(&self) -> usize {
        self.state.lock().unwrap().cleanups
    }

    /// Deliver output through the handler of the most recent spawn
    pub fn emit(&self, kind: OutputKind) {
        let handler = self.state.lock().unwrap().last_handler.clone();
        if let Some((generation, handler)) = handler {
            handler(ProcessOutput { generation, kind });
        }
    }
}

impl ProcessControl for FakeControl {
    fn spawn(&self, args: &[String], generation: u64, handler: OutputHandler) -> Result<ProcessState> {
        let mut state = self.state.lock().unwrap();
        if state.always_fail_spawn || state.failing_spawns > 0 {
            state.failing_spawns = state.failing_spawns.saturating_sub(1);
            return Err(SweepError::Spawn {
                binary: PathBuf::from("fake_sweep"),
                source: io::Error::other("device did not respond"),
            });
        }

        state.next_pid += 1;
        let process = ProcessState::new(state.next_pid, Some(state.next_pid), generation);
        state.spawned.push(args.to_vec());
        state.live.insert(process.pid, process.clone());
        state.last_handler = Some((generation, handler));
        state.dead = false;
        Ok(process)
    }

    fn stop(&self, process: &ProcessState) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        state.live.remove(&process.pid);
        process.mark_exited();
        if state.fail_stop {
            return Err(SweepError::Signal(nix::errno::Errno::EPERM));
        }
        Ok(())
    }

    fn force_kill(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.force_kills += 1;
        for (_, process) in state.live.drain() {
            process.mark_exited();
        }
        Ok(())
    }

    fn is_alive(&self, process: &ProcessState) -> bool {
        let state = self.state.lock().unwrap();
        !state.dead && !process.has_exited() && state.live.contains_key(&process.pid)
    }

    fn cleanup_orphans(&self) -> Result<()> {
        self.state.lock().unwrap().cleanups += 1;
        Ok(())
    }

    fn test_availability(&self) -> AvailabilityReport {
        AvailabilityReport::new(Availability::NotFound, "no device connected")
    }

    fn tracked_count(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }
}

/// Config with short delays, a private lock dir and generous error limits
pub fn test_config(lock_dir: &TempDir) -> SweepdConfig {
    let mut config = SweepdConfig::default();
    config.resource.lock_dir = lock_dir.path().to_path_buf();
    config.process.system_cleanup = false;
    config.errors.max_consecutive_errors = 50;
    config.errors.max_failures_per_minute = 50;
    config.errors.blacklist_threshold = 50;
    config.recovery.max_recovery_attempts = 3;
    config.recovery.recovery_delay_ms = 100;
    config.recovery.escalation_threshold = 2;
    config.recovery.cooldown_period_ms = 200;
    config.recovery.settle_delay_ms = 50;
    config.health.interval_ms = 60_000;
    config.health.data_timeout_ms = 60_000;
    config.coordinator.stop_settle_ms = 100;
    config
}

/// A coordinator wired to a [`FakeControl`] and an event subscription
pub struct Harness {
    pub coordinator: SweepCoordinator,
    pub control: Arc<FakeControl>,
    pub events: Receiver<SweepEvent>,
    pub lock_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut SweepdConfig)) -> Self {
        let lock_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = test_config(&lock_dir);
        adjust(&mut config);

        let control = FakeControl::new();
        let bus = EventBus::new();
        let events = bus.subscribe();
        // Output is fed to the coordinator directly by the tests
        let sink: OutputHandler = Arc::new(|_| {});
        let dyn_control: Arc<dyn ProcessControl> = control.clone();
        let coordinator = SweepCoordinator::new(config, dyn_control, sink, bus);

        Self {
            coordinator,
            control,
            events,
            lock_dir,
        }
    }

    pub fn start_mhz(&mut self, frequencies: &[f64]) -> Result<sweepd::models::StatusSnapshot> {
        self.start(request_mhz(frequencies))
    }

    pub fn start(&mut self, request: SweepRequest) -> Result<sweepd::models::StatusSnapshot> {
        self.coordinator.start(&request)
    }

    fn live_generation(&self) -> u64 {
        self.coordinator
            .current_process()
            .map(|p| p.generation)
            .expect("no live process")
    }

    pub fn stdout(&mut self, text: &str) {
        let generation = self.live_generation();
        self.coordinator.handle_output(ProcessOutput {
            generation,
            kind: OutputKind::Stdout(text.as_bytes().to_vec()),
        });
    }

    pub fn stderr(&mut self, line: &str) {
        let generation = self.live_generation();
        self.coordinator.handle_output(ProcessOutput {
            generation,
            kind: OutputKind::Stderr(line.to_string()),
        });
    }

    pub fn exit(&mut self, code: i32) {
        let generation = self.live_generation();
        self.coordinator.handle_output(ProcessOutput {
            generation,
            kind: OutputKind::Exited {
                code: Some(code),
                signal: None,
            },
        });
    }

    /// Fire every timer due within the next `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.coordinator
            .on_tick(Instant::now() + Duration::from_millis(ms));
    }

    pub fn drain(&self) -> Vec<SweepEvent> {
        self.events.try_iter().collect()
    }

    pub fn state(&self) -> SweepState {
        self.coordinator.state()
    }
}

pub fn request_mhz(frequencies: &[f64]) -> SweepRequest {
    SweepRequest::new(
        frequencies
            .iter()
            .map(|mhz| FrequencyInput::new(*mhz, FrequencyUnit::MHz))
            .collect(),
    )
    .with_cycle_time(60_000)
}

pub fn error_kinds(events: &[SweepEvent]) -> Vec<ErrorKind> {
    events
        .iter()
        .filter_map(|event| match event {
            SweepEvent::Error(error) => Some(error.kind),
            _ => None,
        })
        .collect()
}

pub fn states(events: &[SweepEvent]) -> Vec<SweepState> {
    events
        .iter()
        .filter_map(|event| match event {
            SweepEvent::Status(snapshot) => Some(snapshot.state),
            _ => None,
        })
        .collect()
}

pub fn names(events: &[SweepEvent]) -> Vec<&'static str> {
    events.iter().map(SweepEvent::name).collect()
}

//! Spawns and terminates the external sweep binary.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgid, getpgrp, Pid};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::availability::{self, AvailabilityReport};
use super::control::{OutputHandler, OutputKind, ProcessControl, ProcessOutput, ProcessState};
use super::is_process_alive;
use crate::config::{ProcessConfig, SweepConfig};
use crate::error::{Result, SweepError};

/// Interval between liveness polls while waiting for a graceful exit
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Extra time allowed for the process to be reaped after SIGKILL
const KILL_REAP_TIMEOUT: Duration = Duration::from_millis(500);

const READ_CHUNK_SIZE: usize = 8192;

type Registry = Arc<Mutex<HashMap<u32, ProcessState>>>;

/// Process manager backed by real OS processes.
///
/// Every child is started in its own process group so the whole tree can be
/// signalled without touching the daemon's own group.
pub struct ProcessManager {
    binary: PathBuf,
    info_binary: PathBuf,
    config: ProcessConfig,
    processes: Registry,
}

impl ProcessManager {
    pub fn new(sweep: &SweepConfig, config: ProcessConfig) -> Self {
        Self {
            binary: resolve_binary(&sweep.binary),
            info_binary: resolve_binary(&sweep.info_binary),
            config,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<u32, ProcessState>> {
        self.processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Poll until the process is reaped or `timeout` elapses.
    fn wait_for_exit(&self, state: &ProcessState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if !self.is_alive(state) {
                return true;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
        !self.is_alive(state)
    }

    /// SIGKILL the process and the rest of its group.
    fn kill_tree(&self, state: &ProcessState) -> Result<()> {
        if !state.has_exited() {
            send_signal(state.pid, Signal::SIGKILL)?;
        }
        if let Some(pgid) = state.pgid {
            kill_group(pgid)?;
        }
        Ok(())
    }

    /// Pattern-kill stray copies of the sweep binary by exact process name.
    fn kill_by_name(&self) -> Result<()> {
        let Some(name) = self.binary.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let status = Command::new("pkill")
            .args(["-9", "-x", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        // pkill exits 1 when nothing matched
        match status.code() {
            Some(0) => info!(binary = name, "killed stray sweep processes"),
            Some(1) => debug!(binary = name, "no stray sweep processes"),
            code => warn!(binary = name, ?code, "pkill reported a failure"),
        }
        Ok(())
    }
}

impl ProcessControl for ProcessManager {
    fn spawn(
        &self,
        args: &[String],
        generation: u64,
        handler: OutputHandler,
    ) -> Result<ProcessState> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| SweepError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let pid = child.id();
        let pgid = i32::try_from(pid)
            .ok()
            .and_then(|raw| getpgid(Some(Pid::from_raw(raw))).ok())
            .map(|pgid| pgid.as_raw() as u32);
        let state = ProcessState::new(pid, pgid, generation);
        self.registry().insert(pid, state.clone());
        info!(pid, ?pgid, generation, ?args, "spawned sweep process");

        let readers = spawn_readers(&mut child, generation, &handler);
        spawn_waiter(
            child,
            state.clone(),
            readers,
            Arc::clone(&self.processes),
            handler,
        );
        Ok(state)
    }

    fn stop(&self, state: &ProcessState) -> Result<()> {
        let mut first_error = None;

        if self.is_alive(state) {
            debug!(pid = state.pid, "sending SIGTERM");
            if let Err(e) = send_signal(state.pid, Signal::SIGTERM) {
                first_error.get_or_insert(e);
            }
            if !self.wait_for_exit(state, self.config.stop_grace()) {
                warn!(pid = state.pid, "sweep process ignored SIGTERM, killing");
            }
        }

        if let Err(e) = self.kill_tree(state) {
            first_error.get_or_insert(e);
        }
        if !state.has_exited() && !self.wait_for_exit(state, KILL_REAP_TIMEOUT) {
            warn!(pid = state.pid, "sweep process still present after SIGKILL");
        }

        if self.config.system_cleanup {
            if let Err(e) = self.cleanup_orphans() {
                warn!(error = %e, "system-wide cleanup failed");
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn force_kill(&self) -> Result<()> {
        let tracked: Vec<ProcessState> = self.registry().values().cloned().collect();
        let mut first_error = None;
        for state in &tracked {
            warn!(pid = state.pid, "force killing sweep process");
            if let Err(e) = self.kill_tree(state) {
                first_error.get_or_insert(e);
            }
        }
        for state in &tracked {
            self.wait_for_exit(state, KILL_REAP_TIMEOUT);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_alive(&self, state: &ProcessState) -> bool {
        !state.has_exited() && is_process_alive(state.pid)
    }

    fn cleanup_orphans(&self) -> Result<()> {
        self.kill_by_name()
    }

    fn test_availability(&self) -> AvailabilityReport {
        availability::probe(&self.info_binary, self.config.availability_timeout())
    }

    fn tracked_count(&self) -> usize {
        self.registry().len()
    }
}

/// Use the binary from PATH when it can be found there.
fn resolve_binary(binary: &Path) -> PathBuf {
    which::which(binary).unwrap_or_else(|_| binary.to_path_buf())
}

fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(());
    };
    match kill(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// SIGKILL a process group unless it is our own.
fn kill_group(pgid: u32) -> Result<()> {
    let Ok(raw) = i32::try_from(pgid) else {
        return Ok(());
    };
    if raw <= 1 || Pid::from_raw(raw) == getpgrp() {
        return Ok(());
    }
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn spawn_readers(
    child: &mut Child,
    generation: u64,
    handler: &OutputHandler,
) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);

    if let Some(mut stdout) = child.stdout.take() {
        let handler = Arc::clone(handler);
        readers.push(thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => handler(ProcessOutput {
                        generation,
                        kind: OutputKind::Stdout(buf[..n].to_vec()),
                    }),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(error = %e, "stdout reader stopped");
                        break;
                    }
                }
            }
        }));
    }

    if let Some(stderr) = child.stderr.take() {
        let handler = Arc::clone(handler);
        readers.push(thread::spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line).trim_end().to_string();
                        if !text.is_empty() {
                            handler(ProcessOutput {
                                generation,
                                kind: OutputKind::Stderr(text),
                            });
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "stderr reader stopped");
                        break;
                    }
                }
            }
        }));
    }

    readers
}

/// Reap the child, then report its exit once both pipes are drained.
fn spawn_waiter(
    mut child: Child,
    state: ProcessState,
    readers: Vec<JoinHandle<()>>,
    registry: Registry,
    handler: OutputHandler,
) {
    thread::spawn(move || {
        let status = child.wait();
        state.mark_exited();
        registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&state.pid);

        for reader in readers {
            let _ = reader.join();
        }

        let (code, signal) = match status {
            Ok(status) => (status.code(), status.signal()),
            Err(e) => {
                warn!(pid = state.pid, error = %e, "failed to wait for sweep process");
                (None, None)
            }
        };
        info!(pid = state.pid, ?code, ?signal, "sweep process exited");
        handler(ProcessOutput {
            generation: state.generation,
            kind: OutputKind::Exited { code, signal },
        });
    });
}

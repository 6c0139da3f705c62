//! The seam between the coordinator and the sweep process.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::availability::AvailabilityReport;
use crate::error::Result;

/// Something the sweep process produced
#[derive(Debug, Clone, PartialEq)]
pub enum OutputKind {
    /// Raw stdout bytes, not necessarily line aligned
    Stdout(Vec<u8>),
    /// One stderr line without its terminator
    Stderr(String),
    /// The process exited; sent after all of its output
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

/// Output tagged with the spawn generation that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub generation: u64,
    pub kind: OutputKind,
}

/// Receives output from reader and waiter threads. Must not block.
pub type OutputHandler = Arc<dyn Fn(ProcessOutput) + Send + Sync>;

/// A spawned sweep process.
#[derive(Debug, Clone)]
pub struct ProcessState {
    pub pid: u32,
    pub pgid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub generation: u64,
    exited: Arc<AtomicBool>,
}

impl ProcessState {
    pub fn new(pid: u32, pgid: Option<u32>, generation: u64) -> Self {
        Self {
            pid,
            pgid,
            started_at: Utc::now(),
            generation,
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once the process has been reaped
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

/// Spawns, probes and terminates the sweep binary.
pub trait ProcessControl: Send + Sync {
    /// Launch the sweep binary with `args`. Output is delivered to `handler`
    /// tagged with `generation`.
    fn spawn(&self, args: &[String], generation: u64, handler: OutputHandler)
        -> Result<ProcessState>;

    /// Terminate gracefully, escalating to a kill after the grace period.
    fn stop(&self, state: &ProcessState) -> Result<()>;

    /// Kill every tracked process without a grace period.
    fn force_kill(&self) -> Result<()>;

    fn is_alive(&self, state: &ProcessState) -> bool;

    /// Kill stray sweep binaries system-wide.
    fn cleanup_orphans(&self) -> Result<()>;

    /// Probe the hardware with the info binary.
    fn test_availability(&self) -> AvailabilityReport;

    /// Processes spawned and not yet reaped
    fn tracked_count(&self) -> usize;
}

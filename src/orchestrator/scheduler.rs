//! One-shot timers fired by the coordinator loop.
//!
//! Timers are plain deadlines. The service loop sleeps until
//! [`Scheduler::next_deadline`] and then drains [`Scheduler::due`]. A cancelled
//! handle never fires, so every owner can drop its timers with one call.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Dwell on the current frequency elapsed
    Cycle,
    /// Settle window after advancing to the next frequency elapsed
    Switch,
    HealthCheck,
    /// Respawn after the recovery settle delay
    RecoveryRespawn,
    /// Start another recovery attempt after a failed one
    RecoveryRetry,
    /// Final Idle transition after a stop
    StopSettle,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer that fires `delay` from now.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerHandle {
        self.schedule_at(kind, Instant::now() + delay)
    }

    pub fn schedule_at(&mut self, kind: TimerKind, deadline: Instant) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.insert(handle, Timer { deadline, kind });
        handle
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<(TimerHandle, TimerKind)> {
        let mut fired: Vec<_> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(handle, timer)| (*handle, *timer))
            .collect();
        fired.sort_by_key(|(handle, timer)| (timer.deadline, *handle));

        for (handle, _) in &fired {
            self.timers.remove(handle);
        }
        fired
            .into_iter()
            .map(|(handle, timer)| (handle, timer.kind))
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.timers.values().filter(|timer| timer.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

//! Process lifecycle management for the sweep binary
//!
//! The coordinator talks to processes only through [`ProcessControl`]; the
//! real implementation is [`ProcessManager`].

pub mod availability;
mod control;
mod manager;

pub use availability::{Availability, AvailabilityReport};
pub use control::{OutputHandler, OutputKind, ProcessControl, ProcessOutput, ProcessState};
pub use manager::ProcessManager;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check if a process with the given PID is alive
///
/// Sends the null signal, which checks existence without delivering anything.
/// `EPERM` means the process exists but belongs to someone else; `ESRCH` means
/// it is gone. A zombie still counts as alive until it is reaped, which is why
/// [`ProcessManager`] also consults the exit flag set by its waiter thread.
pub fn is_process_alive(pid: u32) -> bool {
    let pid_i32 = match i32::try_from(pid) {
        Ok(v) => v,
        Err(_) => {
            // PID exceeds i32::MAX, treat as non-existent
            return false;
        }
    };

    match kill(Pid::from_raw(pid_i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => false,
    }
}

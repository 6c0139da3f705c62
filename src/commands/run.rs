//! Run command - sweeps one or more frequencies until interrupted
//!
//! Events are written to stdout as one JSON object per line. Human-readable
//! progress goes to stderr so the stream stays machine-readable.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SweepdConfig;
use crate::error::ErrorKind;
use crate::models::{Frequency, FrequencyInput, SweepEvent, SweepState};
use crate::orchestrator::{SweepRequest, SweepService};
use crate::process::ProcessManager;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options collected from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub frequencies: Vec<Frequency>,
    pub cycle_time_ms: Option<u64>,
    pub switching_time_ms: Option<u64>,
    pub binary: Option<PathBuf>,
}

impl RunOptions {
    pub fn to_request(&self, default_cycle_ms: u64) -> SweepRequest {
        let inputs = self
            .frequencies
            .iter()
            .copied()
            .map(FrequencyInput::from)
            .collect();
        let request = SweepRequest::new(inputs)
            .with_cycle_time(self.cycle_time_ms.unwrap_or(default_cycle_ms));
        match self.switching_time_ms {
            Some(ms) => request.with_switching_time(ms),
            None => request,
        }
    }
}

/// Start a sweep and stream its events until it stops.
///
/// The first Ctrl+C requests a graceful stop, the second an emergency stop.
pub fn execute(mut config: SweepdConfig, options: RunOptions) -> Result<()> {
    if options.frequencies.is_empty() {
        bail!("At least one --freq is required");
    }
    if let Some(binary) = &options.binary {
        config.sweep.binary = binary.clone();
    }

    let request = options.to_request(config.sweep.default_cycle_time_ms);
    let control = Arc::new(ProcessManager::new(&config.sweep, config.process.clone()));
    let mut service = SweepService::start(config, control).context("Failed to start sweep service")?;
    let events = service.subscribe();

    let interrupts = Arc::new(AtomicUsize::new(0));
    let counter = interrupts.clone();
    ctrlc::set_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let snapshot = service
        .start_sweep(request)
        .context("Failed to start sweep")?;
    eprintln!(
        "{} Sweeping {} (Ctrl+C to stop)",
        "→".cyan().bold(),
        describe(&options.frequencies)
    );
    tracing::debug!(state = ?snapshot.state, "sweep started");

    let stdout = std::io::stdout();
    let mut handled = 0;
    let mut terminal = None;
    loop {
        let seen = interrupts.load(Ordering::SeqCst);
        if seen > handled {
            if handled == 0 {
                eprintln!("{} Stopping sweep...", "→".cyan().bold());
                service.stop_sweep()?;
            } else {
                eprintln!("{} Emergency stop", "!".yellow().bold());
                service.emergency_stop()?;
            }
            handled = seen;
        }

        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                let done = is_idle(&event);
                if let Some(message) = terminal_error(&event) {
                    terminal = Some(message.to_string());
                }
                let mut out = stdout.lock();
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
                out.flush()?;
                if done {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    service.shutdown();
    if let Some(message) = terminal {
        bail!("Sweep failed: {message}");
    }
    eprintln!("{} Sweep stopped", "✓".green().bold());
    Ok(())
}

/// The message of an error that ended the sweep on its own
fn terminal_error(event: &SweepEvent) -> Option<&str> {
    match event {
        SweepEvent::Error(error) if matches!(error.kind, ErrorKind::Fatal | ErrorKind::Recovery) => {
            Some(&error.message)
        }
        _ => None,
    }
}

fn is_idle(event: &SweepEvent) -> bool {
    matches!(event, SweepEvent::Status(s) if s.state == SweepState::Idle)
}

fn describe(frequencies: &[Frequency]) -> String {
    frequencies
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

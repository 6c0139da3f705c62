//! The sweep service: one worker thread owning the coordinator.
//!
//! Commands, process output and timer expiries are serialized through a single
//! queue so the coordinator never needs a lock.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::coordinator::SweepCoordinator;
use super::events::EventBus;
use super::request::SweepRequest;
use crate::config::SweepdConfig;
use crate::error::{Result, SweepError};
use crate::models::{HealthReport, StatusSnapshot, SweepEvent};
use crate::process::{OutputHandler, ProcessControl, ProcessOutput};

/// Everything the worker loop reacts to
enum Input {
    Start(SweepRequest, Sender<Result<StatusSnapshot>>),
    Stop(Sender<StatusSnapshot>),
    EmergencyStop(Sender<StatusSnapshot>),
    ForceCleanup(Sender<StatusSnapshot>),
    Status(Sender<StatusSnapshot>),
    Health(Sender<HealthReport>),
    Output(ProcessOutput),
    Shutdown,
}

/// Handle to a running sweep service.
///
/// Dropping the handle shuts the worker down, which stops any sweep and
/// releases the hardware.
pub struct SweepService {
    inputs: Sender<Input>,
    events: EventBus,
    worker: Option<JoinHandle<()>>,
}

impl SweepService {
    /// Validate `config` and start the worker thread.
    pub fn start(config: SweepdConfig, control: Arc<dyn ProcessControl>) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel();
        let events = EventBus::new();

        let output_tx = Mutex::new(tx.clone());
        let sink: OutputHandler = Arc::new(move |output| {
            if let Ok(tx) = output_tx.lock() {
                let _ = tx.send(Input::Output(output));
            }
        });

        let coordinator = SweepCoordinator::new(config, control, sink, events.clone());
        let worker = thread::Builder::new()
            .name("sweepd-coordinator".to_string())
            .spawn(move || run_loop(coordinator, rx))?;
        info!("sweep service started");

        Ok(Self {
            inputs: tx,
            events,
            worker: Some(worker),
        })
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Input) -> Result<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.inputs
            .send(make(reply_tx))
            .map_err(|_| SweepError::ServiceUnavailable)?;
        reply_rx.recv().map_err(|_| SweepError::ServiceUnavailable)
    }

    pub fn start_sweep(&self, request: SweepRequest) -> Result<StatusSnapshot> {
        self.request(|reply| Input::Start(request, reply))?
    }

    pub fn stop_sweep(&self) -> Result<StatusSnapshot> {
        self.request(Input::Stop)
    }

    pub fn emergency_stop(&self) -> Result<StatusSnapshot> {
        self.request(Input::EmergencyStop)
    }

    pub fn force_cleanup(&self) -> Result<StatusSnapshot> {
        self.request(Input::ForceCleanup)
    }

    pub fn get_status(&self) -> Result<StatusSnapshot> {
        self.request(Input::Status)
    }

    pub fn check_health(&self) -> Result<HealthReport> {
        self.request(Input::Health)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<SweepEvent> {
        self.events.subscribe()
    }

    /// Stop the worker and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.inputs.send(Input::Shutdown);
        if worker.join().is_err() {
            warn!("sweep worker panicked");
        }
        info!("sweep service stopped");
    }
}

impl Drop for SweepService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(mut coordinator: SweepCoordinator, inputs: Receiver<Input>) {
    loop {
        let input = match coordinator.next_deadline() {
            Some(deadline) => {
                match inputs.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(input) => Some(input),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match inputs.recv() {
                Ok(input) => Some(input),
                Err(_) => break,
            },
        };

        match input {
            Some(Input::Shutdown) => break,
            Some(input) => dispatch(&mut coordinator, input),
            None => {}
        }
        coordinator.on_tick(Instant::now());
    }

    debug!("sweep worker exiting");
    coordinator.emergency_stop();
}

fn dispatch(coordinator: &mut SweepCoordinator, input: Input) {
    // A dropped reply receiver just means the caller stopped waiting
    match input {
        Input::Start(request, reply) => {
            let _ = reply.send(coordinator.start(&request));
        }
        Input::Stop(reply) => {
            let _ = reply.send(coordinator.stop());
        }
        Input::EmergencyStop(reply) => {
            let _ = reply.send(coordinator.emergency_stop());
        }
        Input::ForceCleanup(reply) => {
            let _ = reply.send(coordinator.force_cleanup());
        }
        Input::Status(reply) => {
            let _ = reply.send(coordinator.status());
        }
        Input::Health(reply) => {
            let _ = reply.send(coordinator.check_health());
        }
        Input::Output(output) => coordinator.handle_output(output),
        Input::Shutdown => {}
    }
}

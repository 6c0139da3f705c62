//! Fan-out of sweep events to any number of observers.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

use crate::models::SweepEvent;

/// Events a subscriber may fall behind by before it is dropped
pub const SUBSCRIBER_CAPACITY: usize = 4096;

/// Cloneable publisher; every clone feeds the same subscribers.
///
/// Subscribers whose receiver was dropped, or whose queue is full, are pruned
/// on the next publish, so publishing never blocks on anyone listening.
#[derive(Debug, Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<SyncSender<SweepEvent>>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(SUBSCRIBER_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Receiver<SweepEvent> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: SweepEvent) {
        trace!(event = event.name(), "publishing");
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(capacity = self.capacity, "dropping subscriber that stopped reading");
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

//! Event bus for oracle events.
//!
//! The aggregator publishes onto a broadcast channel. Each subscriber has an
//! independent buffer; slow subscribers lose the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use meridian_oracle::EventSink;
use meridian_types::OracleEvent;

/// Default per-subscriber buffer.
pub const EVENT_BUFFER: usize = 1000;

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OracleEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<OracleEvent> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: OracleEvent) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }
}

/// Log every event on `rx` as a JSON line until the bus closes.
pub fn spawn_logger(mut rx: broadcast::Receiver<OracleEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut logged = 0;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    match serde_json::to_string(&event) {
                        Ok(json) => info!(target: "meridian::events", "{json}"),
                        Err(e) => warn!("unserializable {} event: {e}", event.name()),
                    }
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        logged
    })
}

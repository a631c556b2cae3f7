//! Event delivery.

use std::sync::{Mutex, PoisonError};

use meridian_types::OracleEvent;
use serde::Serialize;

/// Receiver of oracle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OracleEvent);
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: OracleEvent) {
        let Some(payload) = json_payload(event.name(), &event) else {
            return;
        };
        if event.is_error() {
            tracing::warn!(event = event.name(), token = %event.token(), %payload, "oracle event");
        } else {
            tracing::info!(event = event.name(), token = %event.token(), %payload, "oracle event");
        }
    }
}

fn json_payload<T: Serialize>(name: &str, value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!("unserializable {name} event: {e}");
            None
        }
    }
}

/// Records events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OracleEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far.
    pub fn events(&self) -> Vec<OracleEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove and return every event recorded so far.
    pub fn take(&self) -> Vec<OracleEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: OracleEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::Address;

    fn reason_event(reason: &str) -> OracleEvent {
        OracleEvent::UpdateErrorWithReason {
            oracle: Address::repeat_byte(1),
            token: Address::repeat_byte(2),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit(reason_event("a"));
        sink.emit(reason_event("b"));
        assert_eq!(sink.events(), vec![reason_event("a"), reason_event("b")]);
    }

    #[test]
    fn test_take_drains() {
        let sink = MemorySink::new();
        sink.emit(reason_event("a"));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_log_sink_accepts_events() {
        LogSink.emit(reason_event("logged"));
    }

    #[test]
    fn test_json_payload() {
        let json = json_payload("UpdateErrorWithReason", &reason_event("x")).expect("json");
        assert!(json.contains(r#""reason":"x""#));

        // Non-string map keys cannot be written as JSON.
        let unserializable = std::collections::HashMap::from([((1u8, 2u8), 3u8)]);
        assert_eq!(json_payload("broken", &unserializable), None);
    }
}

//! Shared time source.
//!
//! Every oracle taking part in one aggregation must read the same clock so
//! that staleness is judged consistently. [`SystemClock`] reads wall time;
//! [`ManualClock`] is set explicitly and is shared by cloning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meridian_types::Timestamp;

/// A source of Unix timestamps in seconds.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Jump to `now`. Moving backwards is ignored.
    pub fn set(&self, now: Timestamp) {
        self.now.fetch_max(now, Ordering::SeqCst);
    }

    /// Move forward by `secs` and return the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let prev = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(secs)))
            .unwrap_or_else(|t| t);
        prev.saturating_add(secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        // Later than 2023-11-14.
        assert!(SystemClock.now() > 1_700_000_000);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        assert_eq!(clock.advance(10), 1_010);
        assert_eq!(other.now(), 1_010);
        other.set(2_000);
        assert_eq!(clock.now(), 2_000);
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new(1_000);
        clock.set(500);
        assert_eq!(clock.now(), 1_000);
    }
}

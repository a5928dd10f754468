//! Monotonic millisecond time source.
//!
//! Gesture timing is measured on a monotonic timeline in milliseconds. The
//! value is signed so that events delivered out of order produce a negative
//! gap instead of wrapping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Milliseconds on a monotonic timeline.
pub type Timestamp = i64;

/// Something that can tell the current monotonic time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Timestamp {
        // An i64 of milliseconds covers ~292 million years of uptime.
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// A clock that only moves when told to. Used for replays and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.now.store(at, Ordering::SeqCst);
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, delta_ms: i64) -> Timestamp {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.advance(250), 350);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0);
        assert!(b >= a);
    }
}

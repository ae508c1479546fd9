// src/clock.rs
//
// Logical time for the registry. Every time-dependent decision (license
// expiry, registration order, dispute bookkeeping) reads the clock it was
// constructed with, never the wall clock directly.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ==== TIMESTAMP ====

/// Seconds on the logical clock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The clock origin.
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add a number of seconds, saturating at `u64::MAX`.
    pub fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ==== CLOCK ====

/// Source of the current logical time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time. Implementations must never return a value smaller
    /// than one they returned before.
    fn now(&self) -> Timestamp;
}

fn system_time_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Wall-clock backed time, clamped so it only moves forward.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<u64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = system_time_now_secs();
        let mut last = self.last.lock();
        // A wall clock stepped backwards keeps reporting the last value.
        if now > *last {
            *last = now;
        }
        Timestamp(*last)
    }
}

/// Clock that only moves when told to.
///
/// Used to replay a ledger at recorded times and to drive license expiry in
/// tests without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.0),
        }
    }

    /// Move the clock forward by `secs` seconds and return the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let previous = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(secs))
            })
            .unwrap_or_else(|current| current);
        Timestamp(previous.saturating_add(secs))
    }

    /// Jump to `at`. Requests to move backwards are ignored.
    pub fn set(&self, at: Timestamp) {
        self.secs.fetch_max(at.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let mut previous = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next >= previous, "clock went backwards");
            previous = next;
        }
        assert!(previous.as_secs() > 0);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(Timestamp(100));
        assert_eq!(clock.now(), Timestamp(100));
        assert_eq!(clock.advance(3600), Timestamp(3700));
        assert_eq!(clock.now(), Timestamp(3700));
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::new(Timestamp(500));
        clock.set(Timestamp(200));
        assert_eq!(clock.now(), Timestamp(500));
        clock.set(Timestamp(900));
        assert_eq!(clock.now(), Timestamp(900));
    }

    #[test]
    fn test_timestamp_arithmetic_saturates() {
        let t = Timestamp(u64::MAX - 1);
        assert_eq!(t.saturating_add_secs(10), Timestamp(u64::MAX));
        assert_eq!(Timestamp(5).saturating_since(Timestamp(10)), 0);
        assert_eq!(Timestamp(15).saturating_since(Timestamp(10)), 5);
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp(42)).unwrap();
        assert_eq!(json, "42");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Timestamp(42));
    }
}

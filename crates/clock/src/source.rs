use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A high-resolution counter with a fixed tick frequency.
///
/// `counter()` is allowed to go backwards; the clock clamps what it derives.
pub trait TimeSource {
    /// Counter ticks per second. Must be non-zero.
    fn frequency(&self) -> u64;

    /// Current counter value.
    fn counter(&self) -> i64;
}

/// Monotonic system clock with nanosecond ticks.
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn frequency(&self) -> u64 {
        1_000_000_000
    }

    fn counter(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// Scripted counter. Clones share the same value, so a test can keep one
/// handle and move another into the clock.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    frequency: u64,
    value: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new(frequency: u64) -> Self {
        Self {
            frequency: frequency.max(1),
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn set(&self, counter: i64) {
        self.value.store(counter, Ordering::Relaxed);
    }

    /// Move the counter by `ticks`, which may be negative.
    pub fn advance(&self, ticks: i64) {
        self.value.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Move the counter forward by a number of seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance((secs * self.frequency as f64).round() as i64);
    }
}

impl TimeSource for ManualTimeSource {
    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn counter(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_source_shares_value_between_clones() {
        let a = ManualTimeSource::new(1000);
        let b = a.clone();
        a.advance(250);
        assert_eq!(b.counter(), 250);
        b.advance(-300);
        assert_eq!(a.counter(), -50);
    }

    #[test]
    fn manual_source_zero_frequency_is_clamped() {
        assert_eq!(ManualTimeSource::new(0).frequency(), 1);
    }

    #[test]
    fn system_source_moves_forward() {
        let src = SystemTimeSource::new();
        let a = src.counter();
        let b = src.counter();
        assert!(b >= a);
    }
}

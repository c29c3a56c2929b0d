//! # Time
//!
//! Millisecond durations, the logical clock driven by the Tick Source,
//! and helpers for drift-free periodic tasks. All instants are `u32`
//! milliseconds that wrap; comparisons go through [`reached`].

use core::sync::atomic::{AtomicU32, Ordering};

use crate::kernel;

/// Millisecond duration. One kernel tick is one millisecond.
pub type Duration = fugit::MillisDurationU32;

/// True once `now` is at or past `deadline`, tolerating wrap-around.
#[inline]
pub const fn reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

// ---------------------------------------------------------------------------
// Logical clock
// ---------------------------------------------------------------------------

/// Monotonic, wrapping millisecond counter consumed by the toolkit.
///
/// Only the Tick Source advances it. Readers never take a lock.
pub struct LogicalClock {
    millis: AtomicU32,
}

impl LogicalClock {
    pub const fn new() -> Self {
        Self {
            millis: AtomicU32::new(0),
        }
    }

    /// Advance the clock by `by`.
    #[inline]
    pub fn advance(&self, by: Duration) {
        // Single writer: a load/store pair is enough and also works on
        // cores without read-modify-write atomics.
        let now = self.millis.load(Ordering::Relaxed);
        self.millis
            .store(now.wrapping_add(by.ticks()), Ordering::Release);
    }

    /// Current logical time in milliseconds.
    #[inline]
    pub fn now(&self) -> u32 {
        self.millis.load(Ordering::Acquire)
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Periodic wake-ups
// ---------------------------------------------------------------------------

/// Drift-free period tracker: each wake-up is scheduled relative to the
/// previous deadline, not to when the task actually ran.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    next_wake: u32,
    period: u32,
}

impl Periodic {
    pub const fn new(start: u32, period: Duration) -> Self {
        Self {
            next_wake: start,
            period: period.ticks(),
        }
    }

    /// Step to the next period boundary and return it.
    ///
    /// If the task overran by more than a whole period, the schedule is
    /// re-anchored on `now` instead of firing a burst of late cycles.
    pub fn advance(&mut self, now: u32) -> u32 {
        self.next_wake = self.next_wake.wrapping_add(self.period);
        if reached(now, self.next_wake.wrapping_add(self.period)) {
            self.next_wake = now.wrapping_add(self.period);
        }
        self.next_wake
    }

    /// Sleep the calling task until the next period boundary.
    pub fn wait(&mut self) {
        let wake = self.advance(kernel::now());
        kernel::sleep_until(wake);
    }
}

// ---------------------------------------------------------------------------
// Elapsed time
// ---------------------------------------------------------------------------

/// Accumulates elapsed milliseconds from successive readings of a
/// wrapping clock. Without an origin the first reading sets it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Elapsed {
    last: Option<u32>,
    total_ms: u64,
}

impl Elapsed {
    pub const fn new() -> Self {
        Self {
            last: None,
            total_ms: 0,
        }
    }

    /// Count from the clock reading `origin`.
    pub const fn since(origin: u32) -> Self {
        Self {
            last: Some(origin),
            total_ms: 0,
        }
    }

    /// Fold in a new reading and return the total elapsed milliseconds.
    pub fn update(&mut self, now: u32) -> u64 {
        if let Some(last) = self.last {
            self.total_ms += u64::from(now.wrapping_sub(last));
        }
        self.last = Some(now);
        self.total_ms
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reached_wraps() {
        assert!(reached(10, 10));
        assert!(reached(11, 10));
        assert!(!reached(9, 10));
        assert!(reached(5, u32::MAX - 5));
        assert!(!reached(u32::MAX - 5, 5));
    }

    #[test]
    fn test_clock_advances_and_wraps() {
        let clock = LogicalClock::new();
        clock.advance(Duration::millis(20));
        clock.advance(Duration::millis(20));
        assert_eq!(clock.now(), 40);

        let clock = LogicalClock {
            millis: AtomicU32::new(u32::MAX - 9),
        };
        clock.advance(Duration::millis(20));
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_periodic_is_drift_free() {
        let mut p = Periodic::new(0, Duration::millis(100));
        // Late by 30 ms: next wake stays on the 100 ms grid.
        assert_eq!(p.advance(30), 100);
        assert_eq!(p.advance(130), 200);
    }

    #[test]
    fn test_periodic_reanchors_after_overrun() {
        let mut p = Periodic::new(0, Duration::millis(100));
        assert_eq!(p.advance(450), 550);
        assert_eq!(p.advance(560), 650);
    }

    #[test]
    fn test_elapsed_survives_wrap() {
        let mut e = Elapsed::new();
        assert_eq!(e.update(u32::MAX - 499), 0);
        assert_eq!(e.update(500), 1000);
        assert_eq!(e.update(1500), 2000);
        assert_eq!(e.total_ms(), 2000);
    }

    #[test]
    fn test_elapsed_since_origin_counts_first_reading() {
        let mut e = Elapsed::since(0);
        assert_eq!(e.update(5_000), 5_000);
        assert_eq!(e.update(6_000), 6_000);

        let mut e = Elapsed::since(u32::MAX - 99);
        assert_eq!(e.update(100), 200);
    }
}

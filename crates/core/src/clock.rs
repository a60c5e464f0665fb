//! Monotonic clock abstraction.
//!
//! Timestamps are offsets from a clock-specific origin and are only meaningful
//! for interval arithmetic against other timestamps from the same clock. They are
//! never rendered as calendar time.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// A point on a clock's monotonic timeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> Duration {
        self.0
    }

    /// Elapsed time from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl core::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 + rhs)
    }
}

/// Source of monotonic time plus the ability to suspend the calling thread.
pub trait Clock: Send + Sync {
    /// Strictly non-decreasing across calls.
    fn now(&self) -> Timestamp;

    /// Suspend the calling thread until `deadline` has been reached.
    fn sleep_until(&self, deadline: Timestamp);
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep_until(&self, deadline: Timestamp) {
        (**self).sleep_until(deadline)
    }
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
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
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }

    fn sleep_until(&self, deadline: Timestamp) {
        let remaining = deadline.saturating_duration_since(self.now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

/// Virtual clock for deterministic tests.
///
/// Time only moves through [`ManualClock::advance`] or when a sleeper asks to
/// wake at a later point, in which case the clock jumps straight to that point.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(*self.now.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn sleep_until(&self, deadline: Timestamp) {
        {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            if *now < deadline.0 {
                *now = deadline.0;
            }
        }
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..1_000 {
            let t = clock.now();
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn manual_clock_jumps_to_deadline_but_never_rewinds() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));

        clock.sleep_until(Timestamp::from_offset(Duration::from_secs(8)));
        assert_eq!(clock.now().offset(), Duration::from_secs(8));

        clock.sleep_until(Timestamp::from_offset(Duration::from_secs(2)));
        assert_eq!(clock.now().offset(), Duration::from_secs(8));
    }

    #[test]
    fn saturating_duration_since_clamps_at_zero() {
        let a = Timestamp::from_offset(Duration::from_secs(1));
        let b = Timestamp::from_offset(Duration::from_secs(3));
        assert_eq!(b.saturating_duration_since(a), Duration::from_secs(2));
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
    }
}

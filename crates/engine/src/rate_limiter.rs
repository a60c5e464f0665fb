//! Fixed-window admission gate shared by every worker of an engine.
//!
//! ## Policy
//!
//! - At most `quota` admissions per window, where a window starts at the first
//!   call observed after the previous one expired.
//! - Windows reset exactly at `window` boundaries. There is no sliding refill, so
//!   admissions burst at the start of every window.
//! - Over-quota callers are suspended (not spun) until the window they observed
//!   ends, then retry from scratch.
//!
//! One instance is meant to be constructed per model identity and handed to every
//! worker by reference. Nothing here is process-global.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use batchinfer_core::{Clock, MonotonicClock, RateLimitPolicy, Timestamp};

/// Point-in-time view of the limiter, for logging.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateLimiterState {
    pub quota: u32,
    pub window: Duration,
    pub window_start: Timestamp,
    pub calls_in_window: u64,
}

impl RateLimiterState {
    /// Time left in the current window as seen at `now`.
    pub fn remaining_at(&self, now: Timestamp) -> Duration {
        self.window
            .saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// Proof of one successful pass through the limiter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Start of the window this call was counted against.
    pub window_start: Timestamp,
    pub admitted_at: Timestamp,
    /// 1-based position of this call within its window.
    pub ordinal: u64,
    /// How many times the caller was suspended before being admitted.
    pub suspensions: u32,
}

#[derive(Debug)]
struct Window {
    start: Timestamp,
    calls: u64,
}

#[derive(Debug)]
pub struct RateLimiter<C: Clock = MonotonicClock> {
    quota: u64,
    window: Duration,
    clock: C,
    state: Mutex<Window>,
}

impl RateLimiter<MonotonicClock> {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, MonotonicClock::new())
    }
}

impl<C: Clock> RateLimiter<C> {
    /// A zero quota is clamped to one so that callers always make progress.
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        let start = clock.now();
        Self {
            quota: u64::from(policy.quota.max(1)),
            window: policy.window,
            clock,
            state: Mutex::new(Window { start, calls: 0 }),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Block until the caller may make one external call.
    ///
    /// Never fails: exceeding the quota only costs time.
    pub fn acquire(&self) -> Admission {
        let mut suspensions = 0u32;
        loop {
            let wake_at = {
                let mut w = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                let now = self.clock.now();
                let mut elapsed = now.saturating_duration_since(w.start);

                if elapsed >= self.window {
                    debug!(
                        previous_calls = w.calls,
                        quota = self.quota,
                        "rate limit window reset"
                    );
                    w.calls = 0;
                    w.start = now;
                    elapsed = Duration::ZERO;
                }

                w.calls += 1;

                if w.calls <= self.quota {
                    return Admission {
                        window_start: w.start,
                        admitted_at: now,
                        ordinal: w.calls,
                        suspensions,
                    };
                }

                let remaining = self.window - elapsed;
                debug!(
                    calls_in_window = w.calls,
                    quota = self.quota,
                    window_remaining_ms = remaining.as_millis() as u64,
                    "rate limit reached; suspending worker"
                );
                now + remaining
            };

            // Lock released: only this worker sleeps.
            self.clock.sleep_until(wake_at);
            suspensions = suspensions.saturating_add(1);
        }
    }

    pub fn snapshot(&self) -> RateLimiterState {
        let w = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        RateLimiterState {
            quota: self.quota as u32,
            window: self.window,
            window_start: w.start,
            calls_in_window: w.calls,
        }
    }
}

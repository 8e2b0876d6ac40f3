//! General time utility functions
//!
//! Controllers never read the system time directly, they go through a
//! [`Clock`]. The executable uses [`SystemClock`], tests use [`ManualClock`]
//! so that timeouts can be exercised deterministically.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time which can also be slept on.
pub trait Clock {
    /// Seconds elapsed since the clock's epoch.
    fn now_s(&self) -> f64;

    /// Block for the given duration.
    fn sleep(&self, duration: Duration);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock, with the epoch set on creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant
}

/// A clock which only moves when told to.
///
/// Clones share the same time, so a test can keep a handle and advance the
/// time seen by the code under test. Sleeping advances the clock by the
/// requested duration.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_s: Rc<Cell<f64>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now()
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

impl ManualClock {
    pub fn new(start_s: f64) -> Self {
        Self {
            now_s: Rc::new(Cell::new(start_s))
        }
    }

    /// Move the clock forward by `dt_s` seconds.
    pub fn advance(&self, dt_s: f64) {
        self.now_s.set(self.now_s.get() + dt_s);
    }

    pub fn set(&self, now_s: f64) {
        self.now_s.set(now_s);
    }
}

impl Clock for ManualClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Get the time left in a cycle of `period_s` which started at `start_s`, or
/// `None` if the cycle has already overrun.
pub fn remaining_in_cycle(period_s: f64, start_s: f64, now_s: f64) -> Option<Duration> {
    let remaining_s = period_s - (now_s - start_s);

    if remaining_s > 0.0 && remaining_s.is_finite() {
        Some(Duration::from_secs_f64(remaining_s))
    }
    else {
        None
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! Injected time source.
//!
//! The orchestrator never calls ambient time functions. Timestamps come from
//! [`Clock::now`]; durations are differences of [`Clock::monotonic`]
//! readings, which never go backwards even if the wall clock is adjusted.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps and monotonic elapsed time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Time elapsed since an arbitrary fixed origin.
    fn monotonic(&self) -> Duration;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for deterministic runs.
///
/// Both readings move together on [`ManualClock::advance`]. With a non-zero
/// `tick`, every [`Clock::now`] call also advances the clock by `tick`, so
/// successive timestamps are strictly increasing.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    tick: Duration,
}

#[derive(Debug, Clone, Copy)]
struct ManualState {
    wall: DateTime<Utc>,
    elapsed: Duration,
}

impl ManualClock {
    /// Clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_tick(start, Duration::ZERO)
    }

    /// Clock starting at `start` that advances by `tick` on every `now()`.
    pub fn with_tick(start: DateTime<Utc>, tick: Duration) -> Self {
        Self {
            state: Mutex::new(ManualState {
                wall: start,
                elapsed: Duration::ZERO,
            }),
            tick,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.advance(by);
    }
}

impl ManualState {
    fn advance(&mut self, by: Duration) {
        // Durations beyond chrono's range only move the monotonic reading.
        if let Ok(delta) = chrono::Duration::from_std(by) {
            self.wall += delta;
        }
        self.elapsed += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let wall = state.wall;
        state.advance(self.tick);
        wall
    }

    fn monotonic(&self) -> Duration {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed
    }
}

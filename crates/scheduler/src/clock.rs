use std::time::{Duration, Instant};

/// Abstraction over where frame timestamps originate from.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Clock backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a session timestamp back into an `Instant` for sleeping.
    pub fn instant_at(&self, at: Duration) -> Instant {
        self.origin + at
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for deterministic sessions and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedClock {
    now: Duration,
}

impl SimulatedClock {
    pub fn new(start: Duration) -> Self {
        Self { now: start }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by);
    }

    /// Moves the clock forward to `at`; earlier timestamps are ignored.
    pub fn advance_to(&mut self, at: Duration) {
        if at > self.now {
            self.now = at;
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Duration {
        self.now
    }
}

//! Time sources for the limiter.

use chrono::Utc;
use parking_lot::RwLock;

/// A source of "now" as fractional seconds.
///
/// The limiter only compares timestamps against each other, so any epoch
/// works as long as a single clock is used consistently.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// Wall clock reading Unix time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock that only moves when told to.
///
/// Useful for deterministic tests and for replaying recorded traffic.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: RwLock<f64>,
}

impl ManualClock {
    /// Create a manual clock starting at `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: f64) {
        *self.now.write() = now;
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        *self.now.write() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.read()
    }
}

//! Elapsed-time sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic source of seconds since the simulation started.
pub trait SimulationClock: Send + Sync {
    /// Seconds elapsed since the clock started.
    fn elapsed_secs(&self) -> f64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start a clock now.
    pub fn start() -> Self {
        MonotonicClock {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl SimulationClock for MonotonicClock {
    fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Used for deterministic runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock at `secs`.
    pub fn at(secs: f64) -> Self {
        let clock = ManualClock::default();
        clock.set(secs);
        clock
    }

    /// Jump to `secs`. Negative values clamp to zero.
    pub fn set(&self, secs: f64) {
        let micros = (secs.max(0.0) * 1_000_000.0) as u64;
        self.micros.store(micros, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: f64) {
        let delta = (secs.max(0.0) * 1_000_000.0) as u64;
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }
}

impl SimulationClock for ManualClock {
    fn elapsed_secs(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

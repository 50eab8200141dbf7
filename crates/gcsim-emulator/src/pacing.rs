//! Frame pacing for producer threads.
//!
//! Each producer waits a fixed slot between written frames. The pacer keeps a
//! schedule rather than sleeping a flat delay, so time spent synthesizing and
//! writing is absorbed into the slot.
//!
//! ## Features
//!
//! - **Interruptible waits**: sleeps in short slices and returns early when the
//!   stop flag is raised
//! - **Lag tracking**: detects when a producer falls behind its schedule
//! - **Periodic stats**: frame rate per interval for progress logging

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep before the stop flag is rechecked.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Pacing configuration.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Slot length between written frames.
    pub inter_packet_delay: Duration,

    /// Lag (milliseconds) beyond which a warning is issued.
    pub max_lag_ms: u64,

    /// Warn about lag only once per interval (milliseconds).
    pub lag_warn_interval_ms: u64,

    /// Interval for periodic stats output (in seconds).
    /// If None, periodic stats are disabled.
    pub periodic_stats_interval_secs: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            inter_packet_delay: Duration::from_millis(10),
            max_lag_ms: 100,
            lag_warn_interval_ms: 5000,
            periodic_stats_interval_secs: Some(10),
        }
    }
}

impl PacingConfig {
    /// Config with the given slot length.
    pub fn with_delay(inter_packet_delay: Duration) -> Self {
        PacingConfig {
            inter_packet_delay,
            ..Default::default()
        }
    }

    /// Set the periodic stats interval. Pass None to disable.
    pub fn with_periodic_stats_interval(mut self, interval_secs: Option<u64>) -> Self {
        self.periodic_stats_interval_secs = interval_secs;
        self
    }
}

/// Keeps a producer on its frame schedule.
#[derive(Debug)]
pub struct PacketPacer {
    config: PacingConfig,
    start: Instant,
    next_slot: Instant,
    last_lag_warn: Option<Instant>,
    total_lag_warnings: u64,
    max_lag_seen_ms: u64,
    last_periodic_stats: Instant,
    last_periodic_frames: u64,
}

impl PacketPacer {
    /// Start a schedule now.
    pub fn new(config: PacingConfig) -> Self {
        let now = Instant::now();
        PacketPacer {
            config,
            start: now,
            next_slot: now,
            last_lag_warn: None,
            total_lag_warnings: 0,
            max_lag_seen_ms: 0,
            last_periodic_stats: now,
            last_periodic_frames: 0,
        }
    }

    /// Wait for the next slot after a written frame.
    ///
    /// Returns the lag in milliseconds when the producer is behind by more than
    /// `max_lag_ms` and a warning is due. A lagging schedule restarts from now
    /// instead of bursting to catch up.
    pub fn wait_for_slot(&mut self, stop: &AtomicBool) -> Option<u64> {
        let now = Instant::now();
        let Some(next_slot) = self.next_slot.checked_add(self.config.inter_packet_delay) else {
            // the slot lies past what Instant can represent
            sleep_until(None, stop);
            self.next_slot = Instant::now();
            return None;
        };
        self.next_slot = next_slot;

        if self.next_slot >= now {
            sleep_until(Some(self.next_slot), stop);
            return None;
        }

        let lag_ms = now.duration_since(self.next_slot).as_millis() as u64;
        self.next_slot = now;
        self.max_lag_seen_ms = self.max_lag_seen_ms.max(lag_ms);

        if lag_ms <= self.config.max_lag_ms {
            return None;
        }
        let due = self.last_lag_warn.map_or(true, |last| {
            now.duration_since(last).as_millis() >= self.config.lag_warn_interval_ms as u128
        });
        if due {
            self.last_lag_warn = Some(now);
            self.total_lag_warnings += 1;
            return Some(lag_ms);
        }
        None
    }

    /// Sleep one slot without advancing the schedule. Used when a whole cycle
    /// produced nothing, to avoid spinning.
    pub fn idle(&mut self, stop: &AtomicBool) {
        let delay = self.config.inter_packet_delay.max(Duration::from_millis(1));
        sleep_until(Instant::now().checked_add(delay), stop);
        self.next_slot = Instant::now();
    }

    /// Check if it's time to emit periodic stats and return them if so.
    pub fn check_periodic_stats(&mut self, total_frames: u64) -> Option<PeriodicStats> {
        let interval_secs = self.config.periodic_stats_interval_secs?;

        let now = Instant::now();
        let since_last = now.duration_since(self.last_periodic_stats);
        if since_last.as_secs() < interval_secs {
            return None;
        }

        let frames_since_last = total_frames.saturating_sub(self.last_periodic_frames);
        let frame_rate = if since_last.as_secs_f64() > 0.0 {
            frames_since_last as f64 / since_last.as_secs_f64()
        } else {
            0.0
        };

        self.last_periodic_stats = now;
        self.last_periodic_frames = total_frames;

        Some(PeriodicStats {
            elapsed: self.start.elapsed(),
            total_frames,
            frame_rate,
        })
    }

    /// Statistics about the pacing session.
    pub fn stats(&self) -> PacerStats {
        PacerStats {
            elapsed: self.start.elapsed(),
            total_lag_warnings: self.total_lag_warnings,
            max_lag_seen_ms: self.max_lag_seen_ms,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }
}

/// Sleep until `deadline` or the stop flag. A `None` deadline waits for the flag alone.
fn sleep_until(deadline: Option<Instant>, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return;
                }
                (deadline - now).min(MAX_SLEEP_SLICE)
            }
            None => MAX_SLEEP_SLICE,
        };
        thread::sleep(slice);
    }
}

/// Summary of a pacing session.
#[derive(Debug, Clone)]
pub struct PacerStats {
    /// Wall clock time since the pacer started.
    pub elapsed: Duration,
    /// Number of lag warnings issued.
    pub total_lag_warnings: u64,
    /// Largest lag seen, in milliseconds.
    pub max_lag_seen_ms: u64,
}

/// Progress figures emitted every stats interval.
#[derive(Debug, Clone)]
pub struct PeriodicStats {
    /// Wall clock time since the pacer started.
    pub elapsed: Duration,
    /// Cumulative frames written.
    pub total_frames: u64,
    /// Frames per second over the last interval.
    pub frame_rate: f64,
}

//! Sequence lock gating.
//!
//! The ground station serializes its conversation with each device through a
//! lock file: while the file exists, the station is waiting for that device's
//! response. A gated producer only writes while its lock file is present. If
//! it has been waiting too long, a stall warning is raised, repeated at most
//! once per warn interval.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gcsim_packet::Device;

use crate::EmulatorConfig;

/// Decides whether a device may write, and tracks how long it has waited.
#[derive(Debug, Clone)]
pub struct SequenceGate {
    device: Device,
    lock_path: Option<PathBuf>,
    warn_after: Duration,
    warn_interval: Duration,
    last_written: Instant,
    last_warned: Instant,
    warnings: u64,
}

impl SequenceGate {
    /// Gate `device` on `lock_path`. `None` means always open.
    pub fn new(
        device: Device,
        lock_path: Option<PathBuf>,
        warn_after: Duration,
        warn_interval: Duration,
    ) -> Self {
        let now = Instant::now();
        SequenceGate {
            device,
            lock_path,
            warn_after,
            warn_interval,
            last_written: now,
            last_warned: now,
            warnings: 0,
        }
    }

    /// A gate that never blocks.
    pub fn ungated(device: Device) -> Self {
        Self::new(device, None, Duration::MAX, Duration::MAX)
    }

    /// Gate for `device` as configured under `locks`.
    pub fn from_config(device: Device, config: &EmulatorConfig) -> Self {
        Self::new(
            device,
            config.locks.path_for(device).map(Path::to_path_buf),
            config.lock_warn_after(),
            config.lock_warn_interval(),
        )
    }

    /// The gated device.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The lock file, if gated.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    /// True when the device may write now.
    pub fn is_open(&self) -> bool {
        self.lock_path.as_deref().map_or(true, Path::exists)
    }

    /// Note a successful write.
    pub fn record_write(&mut self) {
        self.last_written = Instant::now();
    }

    /// Time since the last write (or since the gate was created).
    pub fn awaiting(&self) -> Duration {
        self.last_written.elapsed()
    }

    /// Number of stall warnings raised.
    pub fn warnings(&self) -> u64 {
        self.warnings
    }

    /// Returns the wait time when a stall warning is due.
    pub fn check_stall(&mut self) -> Option<Duration> {
        self.check_stall_at(Instant::now())
    }

    /// [`check_stall`](Self::check_stall) against an explicit instant.
    pub fn check_stall_at(&mut self, now: Instant) -> Option<Duration> {
        self.lock_path.as_ref()?;
        let awaiting = now.saturating_duration_since(self.last_written);
        if awaiting > self.warn_after && now.saturating_duration_since(self.last_warned) > self.warn_interval {
            self.last_warned = now;
            self.warnings += 1;
            return Some(awaiting);
        }
        None
    }
}

//! The emulator loop.
//!
//! ## Architecture
//!
//! One producer thread per origin device, all sharing a single transport:
//!
//! ```text
//!   ┌─ AV thread ──┐   ┌─ GSE thread ─┐   ┌─ GCS thread ─┐
//!   │ synthesize   │   │ synthesize   │   │ synthesize   │
//!   │ corrupt      │   │ corrupt      │   │ corrupt      │
//!   │ packet loss  │   │ packet loss  │   │ packet loss  │
//!   │ lock gate    │   │ lock gate    │   │ (never gated)│
//!   │ encode+frame │   │ encode+frame │   │ encode+frame │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          └──────────────────┼──────────────────┘
//!                             ▼
//!                      SharedTransport (one write per lock)
//! ```
//!
//! Each frame is fully computed before the transport lock is taken. Threads
//! stop cooperatively when the stop flag is raised or the run length elapses.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use gcsim_metrics::{metric_defs, MetricLabels};
use gcsim_packet::{Device, Packet, PacketKind};
use gcsim_telemetry::{
    CorruptionInjector, MonotonicClock, SimulationClock, TelemetrySynthesizer,
};
use gcsim_uart_protocol::FrameFormatter;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::{
    EmulatorConfig, EmulatorError, PacingConfig, PacketPacer, Result, SequenceGate,
    SharedTransport,
};

/// What happened to one generated packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Frame written to the transport.
    Written {
        /// Frame length.
        bytes: usize,
    },
    /// Discarded by simulated packet loss.
    Dropped,
    /// Held back because the device's lock file is absent.
    Gated,
    /// Values failed validation or encoding.
    EncodeFailed,
    /// The transport write failed.
    TransportFailed,
}

/// Per-device counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    /// Packets synthesized, whatever became of them.
    pub generated: u64,
    /// Frames handed to the transport successfully.
    pub written: u64,
    /// Packets discarded by simulated loss.
    pub dropped: u64,
    /// Packets held back by the sequence gate.
    pub gated: u64,
    /// Packets that had at least one field corrupted.
    pub corrupted: u64,
    /// Packets whose values failed to encode.
    pub encode_errors: u64,
    /// Frames the transport failed to write.
    pub transport_errors: u64,
    /// Total bytes of written frames.
    pub bytes_written: u64,
}

impl DeviceStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written { bytes } => {
                self.written += 1;
                self.bytes_written += bytes as u64;
            }
            Outcome::Dropped => self.dropped += 1,
            Outcome::Gated => self.gated += 1,
            Outcome::EncodeFailed => self.encode_errors += 1,
            Outcome::TransportFailed => self.transport_errors += 1,
        }
    }
}

/// Result of [`Emulator::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seed the producer RNGs were derived from.
    pub seed: u64,
    /// Counters per device that had packets configured.
    pub devices: BTreeMap<Device, DeviceStats>,
}

impl RunSummary {
    /// Frames written across all devices.
    pub fn total_written(&self) -> u64 {
        self.devices.values().map(|s| s.written).sum()
    }
}

/// Drives synthesis, corruption, encoding and transport.
pub struct Emulator {
    config: EmulatorConfig,
    synth: TelemetrySynthesizer,
    corruption: Option<CorruptionInjector>,
    formatter: FrameFormatter,
    transport: SharedTransport,
    clock: Arc<dyn SimulationClock>,
    stop: Arc<AtomicBool>,
}

impl Emulator {
    /// Validates `config` and builds an emulator writing to `transport`.
    pub fn new(config: EmulatorConfig, transport: SharedTransport) -> Result<Self> {
        config.validate()?;
        let synth = TelemetrySynthesizer::new(config.synth_config())?;
        let corruption = config.corruption_config()?.map(CorruptionInjector::new);
        let formatter = FrameFormatter::new(config.interface_mode);
        Ok(Emulator {
            config,
            synth,
            corruption,
            formatter,
            transport,
            clock: Arc::new(MonotonicClock::start()),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn SimulationClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Flag that stops the run when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// The configuration in use.
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Generate one packet of `kind` and push it through the pipeline.
    pub fn emit<R: Rng + ?Sized>(
        &self,
        kind: PacketKind,
        gate: &SequenceGate,
        rng: &mut R,
        stats: &mut DeviceStats,
    ) -> Outcome {
        let labels = MetricLabels::new(kind.origin().name()).with_packet_kind(kind.name());
        let labels = labels.to_labels();

        let t = self.clock.elapsed_secs();
        let mut values = self.synth.values_for(kind, t, rng);
        stats.generated += 1;
        metrics::counter!(metric_defs::PACKETS_GENERATED.name, &labels).increment(1);

        if let Some(injector) = &self.corruption {
            let changed = injector.corrupt(&mut values, rng);
            if changed > 0 {
                stats.corrupted += 1;
                metrics::counter!(metric_defs::PACKETS_CORRUPTED.name, &labels).increment(1);
                metrics::counter!(metric_defs::FIELDS_CORRUPTED.name, &labels)
                    .increment(changed as u64);
            }
        }

        let outcome = if self.config.packet_loss > 0.0 && rng.gen::<f64>() < self.config.packet_loss {
            trace!("{} dropped", kind);
            metrics::counter!(metric_defs::PACKETS_DROPPED.name, &labels).increment(1);
            Outcome::Dropped
        } else if !gate.is_open() {
            metrics::counter!(metric_defs::PACKETS_GATED.name, &labels).increment(1);
            Outcome::Gated
        } else {
            self.encode_and_write(kind, &values, &labels)
        };

        stats.record(outcome);
        outcome
    }

    fn encode_and_write(
        &self,
        kind: PacketKind,
        values: &gcsim_packet::FieldValues,
        labels: &[(&'static str, String)],
    ) -> Outcome {
        let packet = match Packet::new(kind, values) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("{} not encoded: {}", kind, e);
                metrics::counter!(metric_defs::ENCODE_ERRORS.name, labels).increment(1);
                return Outcome::EncodeFailed;
            }
        };
        let frame = self.formatter.render(&packet);

        match self.transport.write(frame.as_bytes()) {
            Ok(held) => {
                trace!("{} wrote {} bytes", kind, frame.len());
                metrics::counter!(metric_defs::PACKETS_WRITTEN.name, labels).increment(1);
                metrics::histogram!(metric_defs::FRAME_SIZE.name, labels).record(frame.len() as f64);
                let write_labels = MetricLabels::new(kind.origin().name())
                    .with(&[("mode", self.config.interface_mode.to_string())]);
                metrics::histogram!(metric_defs::WRITE_TIME.name, &write_labels)
                    .record(held.as_micros() as f64);
                Outcome::Written { bytes: frame.len() }
            }
            Err(e) => {
                error!(
                    "failed to write {} to {}: {}",
                    kind,
                    self.transport.describe(),
                    e
                );
                metrics::counter!(metric_defs::TRANSPORT_ERRORS.name, labels).increment(1);
                Outcome::TransportFailed
            }
        }
    }

    /// Run until stopped or until the configured run length elapses.
    pub fn run(&self) -> Result<RunSummary> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let deadline = self
            .config
            .run_for()
            .and_then(|d| Instant::now().checked_add(d));

        info!(
            "emulating to {} ({} mode, seed {})",
            self.transport.describe(),
            self.config.interface_mode,
            seed
        );
        if self.config.experimental {
            warn!("experimental mode enabled, values may appear nonsensical");
        }
        if let Some(corruption) = &self.corruption {
            info!(
                "corruption enabled: chance {}, max intensity {}",
                corruption.config().chance(),
                corruption.config().max_intensity()
            );
        }

        let mut summary = RunSummary {
            seed,
            devices: BTreeMap::new(),
        };

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::new();
            let mut failure = None;
            for (index, device) in Device::ALL.into_iter().enumerate() {
                let kinds = self.config.packets_for(device);
                if kinds.is_empty() {
                    continue;
                }
                let rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64));
                let spawned = thread::Builder::new()
                    .name(format!("gcsim-{}", device.name().to_lowercase()))
                    .spawn_scoped(scope, move || self.produce(device, &kinds, rng, deadline));
                match spawned {
                    Ok(handle) => handles.push((device, handle)),
                    Err(e) => {
                        error!("failed to start {} producer: {}", device, e);
                        self.stop.store(true, Ordering::Relaxed);
                        failure = Some(EmulatorError::from(e));
                        break;
                    }
                }
            }

            // every handle is joined so the scope never re-raises a producer panic
            for (device, handle) in handles {
                match handle.join() {
                    Ok(stats) => {
                        summary.devices.insert(device, stats);
                    }
                    Err(_) => {
                        error!("{} producer panicked", device);
                        self.stop.store(true, Ordering::Relaxed);
                        failure.get_or_insert(EmulatorError::ProducerPanicked(device));
                    }
                }
            }
            failure.map_or(Ok(()), Err)
        })?;

        info!(
            "emulator finished: {} frames written",
            summary.total_written()
        );
        Ok(summary)
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        self.stop.load(Ordering::Relaxed) || deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Producer loop for one device.
    fn produce(
        &self,
        device: Device,
        kinds: &[PacketKind],
        mut rng: ChaCha8Rng,
        deadline: Option<Instant>,
    ) -> DeviceStats {
        let mut gate = SequenceGate::from_config(device, &self.config);
        let mut pacer = PacketPacer::new(PacingConfig::with_delay(self.config.inter_packet_delay()));
        let mut stats = DeviceStats::default();
        let device_labels = MetricLabels::new(device.name()).to_labels();

        match gate.lock_path() {
            Some(path) => debug!("{} producer started, gated on {}", device, path.display()),
            None => debug!("{} producer started", device),
        }

        'run: while !self.should_stop(deadline) {
            let mut wrote_any = false;
            for &kind in kinds {
                if self.should_stop(deadline) {
                    break 'run;
                }
                if let Outcome::Written { .. } = self.emit(kind, &gate, &mut rng, &mut stats) {
                    wrote_any = true;
                    gate.record_write();
                    if let Some(lag_ms) = pacer.wait_for_slot(&self.stop) {
                        warn!("{} producer is {} ms behind schedule", device, lag_ms);
                        metrics::gauge!(metric_defs::PACING_LAG.name, &device_labels)
                            .set(lag_ms as f64);
                    }
                }
            }

            if gate.lock_path().is_some() {
                metrics::gauge!(metric_defs::LOCK_WAIT.name, &device_labels)
                    .set(gate.awaiting().as_secs_f64());
            }
            if let Some(waited) = gate.check_stall() {
                warn!(
                    "{} emulation awaiting server sequence timing for {} seconds",
                    device,
                    waited.as_secs_f64().round()
                );
            }
            if let Some(periodic) = pacer.check_periodic_stats(stats.written) {
                info!(
                    "{}: {} frames in {:.0}s ({:.1}/s)",
                    device,
                    periodic.total_frames,
                    periodic.elapsed.as_secs_f64(),
                    periodic.frame_rate
                );
            }
            if !wrote_any {
                pacer.idle(&self.stop);
            }
        }

        let pacing = pacer.stats();
        debug!(
            "{} producer stopped: {} written, {} dropped, {} gated, {} lag warnings",
            device, stats.written, stats.dropped, stats.gated, pacing.total_lag_warnings
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;
    use gcsim_telemetry::ManualClock;

    fn emulator(config: EmulatorConfig) -> (Emulator, MemoryTransport) {
        let memory = MemoryTransport::new();
        let emulator = Emulator::new(config, SharedTransport::new(memory.clone()))
            .unwrap()
            .with_clock(Arc::new(ManualClock::at(2.0)));
        (emulator, memory)
    }

    #[test]
    fn test_emit_raw_frame() {
        let (emulator, memory) = emulator(EmulatorConfig::default());
        let gate = SequenceGate::ungated(Device::Av);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut stats = DeviceStats::default();

        let outcome = emulator.emit(PacketKind::AvToGcsData3, &gate, &mut rng, &mut stats);
        assert_eq!(outcome, Outcome::Written { bytes: 40 });
        assert_eq!(memory.frames()[0][0], 0x05);
        assert_eq!(stats.generated, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.bytes_written, 40);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EmulatorConfig {
            packet_loss: 1.5,
            ..Default::default()
        };
        assert!(Emulator::new(config, SharedTransport::new(MemoryTransport::new())).is_err());
    }

    #[test]
    fn test_transport_failure_counted() {
        let emulator = Emulator::new(
            EmulatorConfig::default(),
            SharedTransport::new(MemoryTransport::failing()),
        )
        .unwrap();
        let gate = SequenceGate::ungated(Device::Gse);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut stats = DeviceStats::default();

        let outcome = emulator.emit(PacketKind::GseToGcsData1, &gate, &mut rng, &mut stats);
        assert_eq!(outcome, Outcome::TransportFailed);
        assert_eq!(stats.transport_errors, 1);
        assert_eq!(stats.written, 0);
    }
}

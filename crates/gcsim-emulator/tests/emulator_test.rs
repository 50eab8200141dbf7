//! Emulator pipeline tests.
//!
//! Frames go to a [`MemoryTransport`] and time comes from a [`ManualClock`]
//! wherever the assertions depend on it, so most of these run without
//! sleeping. The `run()` tests use short bounded runs.

use std::fs;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gcsim_emulator::{
    DeviceStats, Emulator, EmulatorConfig, EmulatorError, MemoryTransport, Outcome,
    PacketTransport, SequenceGate, SharedTransport,
};
use gcsim_packet::{Device, PacketKind};
use gcsim_telemetry::ManualClock;
use gcsim_uart_protocol::InterfaceMode;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helpers
// ============================================================================

fn build(config: EmulatorConfig, time: f64) -> (Emulator, MemoryTransport) {
    let memory = MemoryTransport::new();
    let emulator = Emulator::new(config, SharedTransport::new(memory.clone()))
        .unwrap()
        .with_clock(Arc::new(ManualClock::at(time)));
    (emulator, memory)
}

/// Emits every telemetry kind `rounds` times through ungated gates.
fn emit_rounds(emulator: &Emulator, seed: u64, rounds: usize) -> DeviceStats {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stats = DeviceStats::default();
    for _ in 0..rounds {
        for kind in PacketKind::TELEMETRY {
            let gate = SequenceGate::ungated(kind.origin());
            emulator.emit(kind, &gate, &mut rng, &mut stats);
        }
    }
    stats
}

/// Panics on frames whose leading id byte belongs to an AV packet.
struct FailingAvTransport {
    inner: MemoryTransport,
}

impl PacketTransport for FailingAvTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if matches!(bytes.first(), Some(0x03..=0x05)) {
            panic!("AV link failed");
        }
        self.inner.write(bytes)
    }

    fn describe(&self) -> String {
        "failing AV transport".to_string()
    }
}

// ============================================================================
// Packet Loss
// ============================================================================

#[test]
fn test_full_packet_loss_writes_nothing() {
    let config = EmulatorConfig {
        packet_loss: 1.0,
        ..Default::default()
    };
    let (emulator, memory) = build(config, 1.0);

    let stats = emit_rounds(&emulator, 5, 20);
    assert!(memory.is_empty());
    assert_eq!(stats.generated, 100);
    assert_eq!(stats.dropped, 100);
    assert_eq!(stats.written, 0);
}

#[test]
fn test_no_packet_loss_writes_everything() {
    let (emulator, memory) = build(EmulatorConfig::default(), 1.0);

    let stats = emit_rounds(&emulator, 5, 20);
    assert_eq!(memory.len(), 100);
    assert_eq!(stats.written, 100);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.bytes_written, 20 * (40 + 58 + 40 + 40 + 40));
}

#[test]
fn test_partial_packet_loss() {
    let config = EmulatorConfig {
        packet_loss: 0.5,
        ..Default::default()
    };
    let (emulator, memory) = build(config, 1.0);

    let stats = emit_rounds(&emulator, 9, 200);
    assert_eq!(stats.dropped + stats.written, 1000);
    assert!(stats.dropped > 350 && stats.dropped < 650, "dropped {}", stats.dropped);
    assert_eq!(memory.len() as u64, stats.written);
}

// ============================================================================
// Sequence Gating
// ============================================================================

#[test]
fn test_gated_until_lock_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("av_response.lock");
    let (emulator, memory) = build(EmulatorConfig::default(), 1.0);
    let gate = SequenceGate::new(
        Device::Av,
        Some(lock.clone()),
        Duration::from_secs(5),
        Duration::from_secs(3),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut stats = DeviceStats::default();

    assert_eq!(
        emulator.emit(PacketKind::AvToGcsData1, &gate, &mut rng, &mut stats),
        Outcome::Gated
    );
    assert!(memory.is_empty());

    fs::write(&lock, b"").unwrap();
    assert_eq!(
        emulator.emit(PacketKind::AvToGcsData1, &gate, &mut rng, &mut stats),
        Outcome::Written { bytes: 40 }
    );
    assert_eq!(memory.len(), 1);
    assert_eq!(stats.gated, 1);
    assert_eq!(stats.written, 1);
}

#[test]
fn test_loss_is_drawn_before_gate() {
    let config = EmulatorConfig {
        packet_loss: 1.0,
        ..Default::default()
    };
    let (emulator, _memory) = build(config, 1.0);
    let gate = SequenceGate::new(
        Device::Gse,
        Some(std::path::PathBuf::from("/nonexistent/gse.lock")),
        Duration::from_secs(5),
        Duration::from_secs(3),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut stats = DeviceStats::default();

    assert_eq!(
        emulator.emit(PacketKind::GseToGcsData1, &gate, &mut rng, &mut stats),
        Outcome::Dropped
    );
    assert_eq!(stats.gated, 0);
}

#[test]
fn test_run_holds_gated_device() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EmulatorConfig {
        inter_packet_delay_ms: 1,
        run_for_secs: Some(0.3),
        seed: Some(4),
        ..Default::default()
    };
    config.locks.av_response = Some(dir.path().join("av_response.lock"));
    let memory = MemoryTransport::new();
    let emulator = Emulator::new(config, SharedTransport::new(memory.clone())).unwrap();

    let summary = emulator.run().unwrap();
    let av = summary.devices[&Device::Av];
    let gse = summary.devices[&Device::Gse];
    assert_eq!(av.written, 0);
    assert!(av.gated > 0);
    assert!(gse.written > 0);
    assert!(memory.frames().iter().all(|f| f[0] == 0x06 || f[0] == 0x07));
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_raw_frames_carry_ids_and_lengths() {
    let (emulator, memory) = build(EmulatorConfig::default(), 3.5);
    emit_rounds(&emulator, 2, 1);

    let frames = memory.frames();
    let observed: Vec<(u8, usize)> = frames.iter().map(|f| (f[0], f.len())).collect();
    assert_eq!(
        observed,
        vec![(0x03, 40), (0x04, 58), (0x05, 40), (0x06, 40), (0x07, 40)]
    );
}

#[test]
fn test_text_uart_frames() {
    let config = EmulatorConfig {
        interface_mode: InterfaceMode::TextUart,
        ..Default::default()
    };
    let (emulator, memory) = build(config, 3.5);
    emit_rounds(&emulator, 2, 1);

    let expected_len = [17, 8, 32, 10, 11];
    for (frame, len) in memory.frames().iter().zip(expected_len) {
        let text = std::str::from_utf8(frame).unwrap();
        assert!(text.starts_with(&format!("+TEST: LEN:{}, ", len)), "{}", text);
    }
}

#[test]
fn test_command_kinds_are_emitted() {
    let (emulator, memory) = build(EmulatorConfig::default(), 0.0);
    let gate = SequenceGate::ungated(Device::Gcs);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut stats = DeviceStats::default();

    for kind in [
        PacketKind::GcsToAvStateCmd,
        PacketKind::GcsToGseStateCmd,
        PacketKind::GcsToGseManualControl,
    ] {
        assert_eq!(
            emulator.emit(kind, &gate, &mut rng, &mut stats),
            Outcome::Written { bytes: 12 }
        );
    }
    let ids: Vec<u8> = memory.frames().iter().map(|f| f[0]).collect();
    assert_eq!(ids, vec![0x01, 0x02, 0x09]);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_frames() {
    let config = EmulatorConfig {
        noise_coefficient: 0.6,
        experimental: true,
        ..Default::default()
    };
    let (first, first_frames) = build(config.clone(), 12.25);
    let (second, second_frames) = build(config, 12.25);

    emit_rounds(&first, 77, 10);
    emit_rounds(&second, 77, 10);
    assert_eq!(first_frames.frames(), second_frames.frames());
}

#[test]
fn test_corruption_is_seeded() {
    let mut config = EmulatorConfig::default();
    config.corruption.enabled = true;
    config.corruption.chance = 0.5;
    config.corruption.max_intensity = 0.5;

    let (first, first_frames) = build(config.clone(), 8.0);
    let (second, second_frames) = build(config, 8.0);
    let stats = emit_rounds(&first, 3, 10);
    emit_rounds(&second, 3, 10);

    assert!(stats.corrupted > 0);
    assert_eq!(first_frames.frames(), second_frames.frames());
}

// ============================================================================
// Run Loop
// ============================================================================

#[test]
fn test_bounded_run_writes_av_and_gse() {
    let config = EmulatorConfig {
        inter_packet_delay_ms: 1,
        run_for_secs: Some(0.3),
        seed: Some(1),
        ..Default::default()
    };
    let memory = MemoryTransport::new();
    let emulator = Emulator::new(config, SharedTransport::new(memory.clone())).unwrap();

    let started = Instant::now();
    let summary = emulator.run().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(summary.seed, 1);
    assert!(summary.devices[&Device::Av].written > 0);
    assert!(summary.devices[&Device::Gse].written > 0);
    assert!(!summary.devices.contains_key(&Device::Gcs));
    assert_eq!(summary.total_written(), memory.len() as u64);
}

#[test]
fn test_stop_handle_ends_run() {
    let config = EmulatorConfig {
        inter_packet_delay_ms: 5,
        ..Default::default()
    };
    let memory = MemoryTransport::new();
    let emulator = Emulator::new(config, SharedTransport::new(memory.clone())).unwrap();
    let stop = emulator.stop_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        stop.store(true, Ordering::SeqCst);
    });

    let started = Instant::now();
    let summary = emulator.run().unwrap();
    stopper.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(summary.total_written() > 0);
}

#[test]
fn test_producer_panic_is_reported() {
    let config = EmulatorConfig {
        inter_packet_delay_ms: 1,
        run_for_secs: Some(10.0),
        seed: Some(2),
        ..Default::default()
    };
    let memory = MemoryTransport::new();
    let transport = FailingAvTransport {
        inner: memory.clone(),
    };
    let emulator = Emulator::new(config, SharedTransport::new(transport)).unwrap();

    let started = Instant::now();
    let err = emulator.run().unwrap_err();
    assert!(matches!(err, EmulatorError::ProducerPanicked(Device::Av)), "{:?}", err);

    // the panic stops the surviving producer well before the run length
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(emulator.stop_handle().load(Ordering::SeqCst));
}

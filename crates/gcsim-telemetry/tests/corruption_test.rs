//! Corrupted values must still encode.
//!
//! Bit flips keep ints inside their magnitude's width, floats inside the f32
//! range and leave text alone, so every synthesized packet survives even the
//! harshest corruption setting.

use gcsim_packet::{Packet, PacketKind};
use gcsim_telemetry::{CorruptionConfig, CorruptionInjector, SynthConfig, TelemetrySynthesizer};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const ITERATIONS: usize = 500;

fn injector() -> CorruptionInjector {
    CorruptionInjector::new(CorruptionConfig::new(1.0, 1.0).unwrap())
}

#[test]
fn test_every_kind_encodes_after_full_corruption() {
    let injector = injector();

    for experimental in [false, true] {
        for noise_coefficient in [0.0, 0.1, 1.0] {
            let synth = TelemetrySynthesizer::new(SynthConfig {
                noise_coefficient,
                experimental,
            })
            .unwrap();

            for kind in PacketKind::ALL {
                let mut rng = ChaCha8Rng::seed_from_u64(kind.id() as u64);
                let mut corrupted = 0;
                for i in 0..ITERATIONS {
                    let t = i as f64 * 0.37;
                    let mut values = synth.values_for(kind, t, &mut rng);
                    corrupted += injector.corrupt(&mut values, &mut rng);

                    if let Err(e) = Packet::new(kind, &values) {
                        panic!(
                            "{} at t={} (experimental {}, noise {}): {}\n{:?}",
                            kind, t, experimental, noise_coefficient, e, values
                        );
                    }
                }
                if !synth.values_for(kind, 0.0, &mut rng).is_empty() {
                    assert!(corrupted > 0, "{} was never corrupted", kind);
                }
            }
        }
    }
}

#[test]
fn test_corrupted_packet_keeps_its_length() {
    let injector = injector();
    let synth = TelemetrySynthesizer::new(SynthConfig::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for kind in PacketKind::TELEMETRY {
        for _ in 0..50 {
            let mut values = synth.values_for(kind, 3.0, &mut rng);
            injector.corrupt(&mut values, &mut rng);
            let packet = Packet::new(kind, &values).unwrap();
            assert_eq!(packet.payload(true).len(), kind.payload_len(true));
        }
    }
}

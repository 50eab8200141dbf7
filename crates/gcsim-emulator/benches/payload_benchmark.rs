//! Throughput benchmarks for the per-frame pipeline.
//!
//! ## Running the benchmarks
//!
//! ```bash
//! cargo bench -p gcsim-emulator
//! ```
//!
//! ## Benchmarks included
//!
//! - `synthesize/<kind>` - values for one packet
//! - `build_payload/<kind>` - encoding synthesized values
//! - `render/<mode>` - raw and UART framing of an AV_TO_GCS_DATA_2 packet
//! - `corrupt` - bit-flip pass over one packet's values

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gcsim_packet::{build_payload, Packet, PacketKind};
use gcsim_telemetry::{CorruptionConfig, CorruptionInjector, SynthConfig, TelemetrySynthesizer};
use gcsim_uart_protocol::{FrameFormatter, InterfaceMode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn synthesizer() -> TelemetrySynthesizer {
    TelemetrySynthesizer::new(SynthConfig {
        noise_coefficient: 0.1,
        experimental: false,
    })
    .expect("valid synth config")
}

fn bench_synthesize(c: &mut Criterion) {
    let synth = synthesizer();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut group = c.benchmark_group("synthesize");

    for kind in PacketKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind.name()), &kind, |b, &kind| {
            let mut t = 0.0;
            b.iter(|| {
                t += 0.01;
                black_box(synth.values_for(kind, t, &mut rng))
            });
        });
    }
    group.finish();
}

fn bench_build_payload(c: &mut Criterion) {
    let synth = synthesizer();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut group = c.benchmark_group("build_payload");

    for kind in PacketKind::ALL {
        let values = synth.values_for(kind, 1.25, &mut rng);
        group.throughput(Throughput::Bytes(kind.payload_len(true) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(kind.name()), &values, |b, values| {
            b.iter(|| black_box(build_payload(kind, values, true)));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let synth = synthesizer();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let values = synth.values_for(PacketKind::AvToGcsData2, 1.25, &mut rng);
    let packet = Packet::new(PacketKind::AvToGcsData2, &values).expect("encodable values");
    let mut group = c.benchmark_group("render");

    for mode in [InterfaceMode::Raw, InterfaceMode::TextUart] {
        let formatter = FrameFormatter::new(mode);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &packet, |b, packet| {
            b.iter(|| black_box(formatter.render(packet)));
        });
    }
    group.finish();
}

fn bench_corrupt(c: &mut Criterion) {
    let synth = synthesizer();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let values = synth.values_for(PacketKind::AvToGcsData1, 1.25, &mut rng);
    let injector = CorruptionInjector::new(CorruptionConfig::new(0.5, 0.3).expect("valid corruption"));

    c.bench_function("corrupt", |b| {
        b.iter(|| {
            let mut values = values.clone();
            black_box(injector.corrupt(&mut values, &mut rng))
        });
    });
}

criterion_group!(
    benches,
    bench_synthesize,
    bench_build_payload,
    bench_render,
    bench_corrupt
);
criterion_main!(benches);

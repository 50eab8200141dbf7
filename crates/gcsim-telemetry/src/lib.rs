//! Synthetic telemetry for the ground-control link.
//!
//! Provides the value side of packet emulation:
//!
//! ```text
//!   SimulationClock ──t──▶ TelemetrySynthesizer ──FieldValues──▶ CorruptionInjector
//!                              (waveforms)                         (bit flips)
//! ```
//!
//! The output is a [`FieldValues`](gcsim_packet::FieldValues) map ready for
//! [`gcsim_packet::Packet::new`]. All randomness comes from a caller-supplied
//! RNG so runs can be reproduced from a seed.

mod clock;
mod corruption;
mod error;
mod synth;
pub mod waveform;

pub use clock::*;
pub use corruption::*;
pub use error::*;
pub use synth::*;

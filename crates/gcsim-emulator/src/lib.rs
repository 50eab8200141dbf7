//! Ground-control link emulator.
//!
//! Wires the telemetry synthesizer, corruption injector, packet codec and
//! frame formatter into per-device producer threads that write finished
//! frames to a shared device.
//!
//! ## Key Types
//!
//! - [`EmulatorConfig`]: YAML configuration with CLI overrides
//! - [`Emulator`]: the producer loop, see [`Emulator::run`] and [`Emulator::emit`]
//! - [`SharedTransport`]: the mutex-guarded frame sink
//! - [`SequenceGate`]: lock-file gating for AV and GSE output
//! - [`dump_frame`] and [`catalog`]: offline inspection
//!
//! ## Example
//!
//! ```rust
//! use gcsim_emulator::{Emulator, EmulatorConfig, MemoryTransport, SharedTransport};
//!
//! let config = EmulatorConfig {
//!     run_for_secs: Some(0.05),
//!     inter_packet_delay_ms: 1,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! let memory = MemoryTransport::new();
//! let emulator = Emulator::new(config, SharedTransport::new(memory.clone())).unwrap();
//! let summary = emulator.run().unwrap();
//! assert_eq!(summary.total_written(), memory.len() as u64);
//! ```

mod config;
mod emulator;
mod error;
mod inspect;
mod pacing;
mod sequence;
mod transport;

pub use config::*;
pub use emulator::*;
pub use error::*;
pub use inspect::*;
pub use pacing::*;
pub use sequence::*;
pub use transport::*;

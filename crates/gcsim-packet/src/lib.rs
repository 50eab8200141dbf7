//! Ground-control link packet encoding.
//!
//! This crate turns named telemetry and command values into the exact byte
//! layouts exchanged between the avionics (AV), ground support equipment (GSE)
//! and ground control station (GCS).
//!
//! # Overview
//!
//! - [`field`] - big-endian scalar encoders with range checks
//! - [`flags`] - packed flag bytes and their inverted twins
//! - [`PacketKind`] - the eight packet kinds and their static schemas
//! - [`Packet`] - a fully encoded packet instance
//!
//! # Example
//!
//! ```rust
//! use gcsim_packet::{build_payload, FieldValues, PacketKind};
//!
//! let mut values = FieldValues::new();
//! values.insert("altitude".into(), 1500.0.into());
//!
//! let payload = build_payload(PacketKind::AvToGcsData1, &values, true).unwrap();
//! assert_eq!(payload[0], 0x03);
//! assert_eq!(payload.len(), PacketKind::AvToGcsData1.payload_len(true));
//! ```

mod error;
pub mod field;
pub mod flags;
mod packet;
mod schema;
mod value;

pub use error::*;
pub use flags::{FlagSet, FlagSlot};
pub use packet::*;
pub use schema::*;
pub use value::*;

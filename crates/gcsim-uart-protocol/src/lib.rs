//! Ground-Control Link Wire Framing
//!
//! Encoded packets reach the transport in one of two framings, chosen once at
//! startup by an [`InterfaceMode`]:
//!
//! - **Raw**: ID, RSSI and SNR as big-endian f32, then the packet fields
//! - **Text UART**: a three-line `+TEST:` report in the radio modem's format,
//!   carrying the ID and fields as quoted uppercase hex
//!
//! # Example
//!
//! ```rust
//! use gcsim_packet::{Packet, PacketKind};
//! use gcsim_uart_protocol::{FrameFormatter, InterfaceMode};
//!
//! let packet = Packet::with_defaults(PacketKind::GcsToAvStateCmd).unwrap();
//! let frame = FrameFormatter::new(InterfaceMode::TextUart).render(&packet);
//! assert!(frame.as_bytes().starts_with(b"+TEST: LEN:4"));
//! ```

mod error;
mod frame;

pub use error::*;
pub use frame::*;

//! Frame rendering.
//!
//! Raw mode writes the payload with link metadata:
//!
//! ```text
//! +----+----------+---------+----------------+
//! | id | rssi f32 | snr f32 | fields ...     |
//! +----+----------+---------+----------------+
//! ```
//!
//! Text mode imitates the radio modem's receive report. The payload is
//! written without metadata, as uppercase hex, and RSSI/SNR move into the
//! header line:
//!
//! ```text
//! +TEST: LEN:<n>, RSSI:<r>, SNR:<s>\r\n
//! +TEST: RX\n
//! "<HEX>"\r\n
//! ```
//!
//! `<n>` counts schema fragments plus one for the ID, not bytes.

use bytes::{BufMut, Bytes, BytesMut};
use gcsim_packet::{FieldValues, Packet, PacketKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{FrameError, FrameResult};

/// Prefix of every modem report line.
pub const REPORT_PREFIX: &str = "+TEST: ";

/// How frames are presented to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterfaceMode {
    /// Binary payload with RSSI/SNR metadata.
    #[default]
    #[serde(rename = "RAW", alias = "raw")]
    Raw,
    /// Modem-style text report.
    #[serde(rename = "TEXT_UART", alias = "text-uart", alias = "text_uart")]
    TextUart,
}

impl InterfaceMode {
    /// Configuration name of the mode.
    pub const fn name(&self) -> &'static str {
        match self {
            InterfaceMode::Raw => "RAW",
            InterfaceMode::TextUart => "TEXT_UART",
        }
    }
}

impl std::fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterfaceMode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RAW" => Ok(InterfaceMode::Raw),
            "TEXT_UART" => Ok(InterfaceMode::TextUart),
            _ => Err(FrameError::UnknownMode(s.to_string())),
        }
    }
}

/// A transport-ready frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// Binary payload.
    Raw(Bytes),
    /// Modem text report.
    UartText(String),
}

impl WireFrame {
    /// The bytes to hand to the transport.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WireFrame::Raw(bytes) => &bytes[..],
            WireFrame::UartText(text) => text.as_bytes(),
        }
    }

    /// Frame size in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the frame has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render a packet as a modem receive report.
pub fn render_uart_text(packet: &Packet) -> String {
    let payload = packet.payload(false);
    let rssi = whole_number(packet.rssi());
    let snr = whole_number(packet.snr());
    format!(
        "{prefix}LEN:{len}, RSSI:{rssi}, SNR:{snr}\r\n{prefix}RX\n\"{hex}\"\r\n",
        prefix = REPORT_PREFIX,
        len = packet.fragment_count() + 1,
        hex = hex::encode_upper(payload),
    )
}

/// Round half to even and print without a fraction. Values beyond the `i64`
/// range print in full; negative zero prints as `0`.
fn whole_number(value: f64) -> String {
    let rounded = value.round_ties_even();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.0}", rounded)
}

/// Render a packet as a binary frame with metadata.
pub fn render_raw(packet: &Packet) -> Bytes {
    let kind = packet.kind();
    let mut buf = BytesMut::with_capacity(kind.payload_len(true));
    buf.put_u8(kind.id());
    buf.put_f32(packet.rssi() as f32);
    buf.put_f32(packet.snr() as f32);
    for fragment in packet.fragments() {
        buf.put_slice(fragment);
    }
    buf.freeze()
}

/// Renders packets in the configured interface mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameFormatter {
    mode: InterfaceMode,
}

impl FrameFormatter {
    /// Create a formatter for a fixed interface mode.
    pub fn new(mode: InterfaceMode) -> Self {
        FrameFormatter { mode }
    }

    /// The interface mode in use.
    pub fn mode(&self) -> InterfaceMode {
        self.mode
    }

    /// Render an encoded packet.
    pub fn render(&self, packet: &Packet) -> WireFrame {
        let frame = match self.mode {
            InterfaceMode::Raw => WireFrame::Raw(render_raw(packet)),
            InterfaceMode::TextUart => WireFrame::UartText(render_uart_text(packet)),
        };
        log::trace!("{} frame for {}: {} bytes", self.mode, packet.kind(), frame.len());
        frame
    }

    /// Build and render a packet from named values.
    pub fn render_values(&self, kind: PacketKind, values: &FieldValues) -> FrameResult<WireFrame> {
        let packet = Packet::new(kind, values)?;
        Ok(self.render(&packet))
    }
}

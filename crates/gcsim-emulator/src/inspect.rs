//! Offline inspection: single-frame dumps and the packet catalog.

use gcsim_packet::{Device, FieldValues, Packet, PacketKind};
use gcsim_telemetry::{CorruptionInjector, TelemetrySynthesizer};
use gcsim_uart_protocol::{FrameFormatter, InterfaceMode, WireFrame};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{EmulatorConfig, Result};

/// One rendered frame and the values it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDump {
    /// Packet kind, serialized by its catalog name.
    pub kind: PacketKind,
    /// Wire id of the kind.
    pub id: u8,
    /// Device that sends this kind.
    pub origin: Device,
    /// Framing used for `frame`.
    pub interface_mode: InterfaceMode,
    /// Seconds since start the values were synthesized for.
    pub time: f64,
    /// Uppercase hex for raw frames, the report text for UART frames.
    pub frame: String,
    /// Frame length in bytes.
    pub length: usize,
    /// Values after any corruption.
    pub values: FieldValues,
}

/// Synthesize, optionally corrupt, and render one frame of `kind` at `time`.
///
/// Uses the config's noise, experimental, corruption and interface settings,
/// and its seed (0 when unset) so the output is reproducible.
pub fn dump_frame(config: &EmulatorConfig, kind: PacketKind, time: f64) -> Result<FrameDump> {
    config.validate()?;
    let synth = TelemetrySynthesizer::new(config.synth_config())?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or(0));

    let mut values = synth.values_for(kind, time, &mut rng);
    if let Some(corruption) = config.corruption_config()? {
        CorruptionInjector::new(corruption).corrupt(&mut values, &mut rng);
    }

    let packet = Packet::new(kind, &values)?;
    let frame = FrameFormatter::new(config.interface_mode).render(&packet);
    let length = frame.len();
    let frame = match frame {
        WireFrame::Raw(bytes) => hex::encode_upper(bytes),
        WireFrame::UartText(text) => text,
    };

    Ok(FrameDump {
        kind,
        id: kind.id(),
        origin: kind.origin(),
        interface_mode: config.interface_mode,
        time,
        frame,
        length,
        values,
    })
}

/// One row of the packet catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub kind: PacketKind,
    pub id: u8,
    pub origin: Device,
    /// Raw frame length, including ID and RSSI/SNR.
    pub raw_len: usize,
    /// Length reported in the UART `LEN:` header.
    pub uart_len: usize,
}

/// Every packet kind with its wire sizes, in ID order.
pub fn catalog() -> Vec<CatalogEntry> {
    PacketKind::ALL
        .into_iter()
        .map(|kind| CatalogEntry {
            kind,
            id: kind.id(),
            origin: kind.origin(),
            raw_len: kind.payload_len(true),
            uart_len: kind.fragment_count() + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsim_packet::FieldValue;

    #[test]
    fn test_catalog_rows() {
        let rows = catalog();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].kind, PacketKind::GcsToAvStateCmd);
        assert_eq!(rows[0].raw_len, 12);
        let av2 = rows.iter().find(|r| r.kind == PacketKind::AvToGcsData2).unwrap();
        assert_eq!(av2.id, 0x04);
        assert_eq!(av2.origin, Device::Av);
        assert_eq!(av2.raw_len, 58);
        assert_eq!(av2.uart_len, 8);
    }

    #[test]
    fn test_dump_raw_is_hex() {
        let config = EmulatorConfig {
            noise_coefficient: 0.0,
            ..Default::default()
        };
        let dump = dump_frame(&config, PacketKind::AvToGcsData3, 0.0).unwrap();
        assert_eq!(dump.length, 40);
        assert_eq!(dump.frame.len(), 80);
        assert!(dump.frame.starts_with("05"));
        assert_eq!(dump.values["flight_state"], FieldValue::Int(0));
    }

    #[test]
    fn test_dump_is_reproducible() {
        let config = EmulatorConfig {
            seed: Some(11),
            interface_mode: InterfaceMode::TextUart,
            ..Default::default()
        };
        let a = dump_frame(&config, PacketKind::GseToGcsData2, 4.2).unwrap();
        let b = dump_frame(&config, PacketKind::GseToGcsData2, 4.2).unwrap();
        assert_eq!(a, b);
        assert!(a.frame.starts_with("+TEST: LEN:11, "));
    }
}

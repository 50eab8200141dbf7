//! Packet assembly.
//!
//! A [`Packet`] is built once from named values, encoding every schema field
//! up front. Any failure aborts the whole packet, so a `Packet` that exists
//! always renders a complete, fixed-length payload.

use crate::field::{
    encode_fixed_ascii, encode_float32, encode_float64, encode_signed_int, encode_unsigned_int,
    format_coordinate,
};
use crate::flags::{FlagSet, FlagSlot};
use crate::schema::{FieldKind, FieldSpec, LATITUDE_KEY, LONGITUDE_KEY, RSSI_KEY, SNR_KEY};
use crate::{FieldError, FieldValue, FieldValues, PacketError, PacketKind};

/// An encoded packet instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    kind: PacketKind,
    rssi: f64,
    snr: f64,
    fragments: Vec<Vec<u8>>,
}

impl Packet {
    /// Build a packet from named values, filling omitted fields with defaults.
    ///
    /// Names the kind does not carry are rejected.
    pub fn new(kind: PacketKind, values: &FieldValues) -> Result<Self, PacketError> {
        if let Some(name) = values.keys().find(|name| !kind.accepts(name)) {
            return Err(PacketError::unknown_field(kind, name.as_str()));
        }

        let lookup = Lookup { kind, values };
        let rssi = lookup.float(RSSI_KEY)?;
        let snr = lookup.float(SNR_KEY)?;
        for (name, value) in [(RSSI_KEY, rssi), (SNR_KEY, snr)] {
            encode_float32(value).map_err(|e| PacketError::field(kind, name, e))?;
        }

        let mut fragments = Vec::with_capacity(kind.fragment_count());
        for spec in kind.schema() {
            match spec.kind {
                FieldKind::Padding(len) => fragments.extend((0..len).map(|_| vec![0u8])),
                _ => fragments.push(lookup.encode(spec)?),
            }
        }

        log::trace!("{}: encoded {} fragments", kind, fragments.len());

        Ok(Packet {
            kind,
            rssi,
            snr,
            fragments,
        })
    }

    /// Build a packet with every field at its default.
    pub fn with_defaults(kind: PacketKind) -> Result<Self, PacketError> {
        Self::new(kind, &FieldValues::new())
    }

    /// The packet kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Received signal strength carried as metadata.
    pub fn rssi(&self) -> f64 {
        self.rssi
    }

    /// Signal-to-noise ratio carried as metadata.
    pub fn snr(&self) -> f64 {
        self.snr
    }

    /// Encoded schema fields, in order.
    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    /// Number of encoded fragments.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Render the payload: ID, optional RSSI/SNR, then every field.
    pub fn payload(&self, include_meta: bool) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.kind.payload_len(include_meta));
        buf.push(self.kind.id());
        if include_meta {
            buf.extend_from_slice(&(self.rssi as f32).to_be_bytes());
            buf.extend_from_slice(&(self.snr as f32).to_be_bytes());
        }
        for fragment in &self.fragments {
            buf.extend_from_slice(fragment);
        }
        buf
    }
}

/// Build a payload for `kind` from named values in one step.
pub fn build_payload(
    kind: PacketKind,
    values: &FieldValues,
    include_meta: bool,
) -> Result<Vec<u8>, PacketError> {
    Ok(Packet::new(kind, values)?.payload(include_meta))
}

// ============================================================================
// Value Lookup
// ============================================================================

struct Lookup<'a> {
    kind: PacketKind,
    values: &'a FieldValues,
}

impl Lookup<'_> {
    fn get(&self, name: &str) -> Result<FieldValue, PacketError> {
        match self.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => self
                .kind
                .default_value(name)
                .ok_or_else(|| PacketError::unknown_field(self.kind, name)),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str, value: &FieldValue) -> PacketError {
        PacketError::field(
            self.kind,
            name,
            FieldError::type_mismatch(expected, value.type_name()),
        )
    }

    fn bool(&self, name: &str) -> Result<bool, PacketError> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(name, "bool", &value))
    }

    fn int(&self, name: &str) -> Result<i64, PacketError> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| self.mismatch(name, "int", &value))
    }

    fn float(&self, name: &str) -> Result<f64, PacketError> {
        let value = self.get(name)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(name, "float", &value))
    }

    fn text(&self, name: &str) -> Result<String, PacketError> {
        match self.get(name)? {
            FieldValue::Text(text) => Ok(text),
            other => Err(self.mismatch(name, "text", &other)),
        }
    }

    fn coordinate(&self, name: &str, len: usize) -> Result<Vec<u8>, PacketError> {
        let text = match self.get(name)? {
            FieldValue::Text(text) => text,
            FieldValue::Float(value) => self.wrap(name, format_coordinate(value, len))?,
            FieldValue::Int(value) => self.wrap(name, format_coordinate(value as f64, len))?,
            other => return Err(self.mismatch(name, "text", &other)),
        };
        self.wrap(name, encode_fixed_ascii(&text, len))
    }

    fn wrap<T>(&self, name: &str, result: Result<T, FieldError>) -> Result<T, PacketError> {
        result.map_err(|e| PacketError::field(self.kind, name, e))
    }

    fn flag_set(&self, spec: &FieldSpec, slots: &[FlagSlot]) -> Result<FlagSet, PacketError> {
        let mut set = FlagSet::new();
        for slot in slots {
            match *slot {
                FlagSlot::Flag { name, .. } => set.push_flag(self.bool(name)?),
                FlagSlot::Bits { name, width, .. } => {
                    let value = self.int(name)?;
                    let max = (1i64 << width) - 1;
                    if !(0..=max).contains(&value) {
                        return Err(PacketError::field(
                            self.kind,
                            name,
                            FieldError::integer_range(value as i128, 0, max as i128),
                        ));
                    }
                    set.push_bits(value as u32, width as u32);
                }
                FlagSlot::Marker { pattern, width } => set.push_bits(pattern as u32, width as u32),
            }
        }
        log::trace!("{}.{}: {} flag bits", self.kind, spec.name, set.bit_width());
        Ok(set)
    }

    fn encode(&self, spec: &FieldSpec) -> Result<Vec<u8>, PacketError> {
        let name = spec.name;
        match spec.kind {
            FieldKind::Flags(slots) => {
                let set = self.flag_set(spec, slots)?;
                self.wrap(name, set.to_bytes())
            }
            FieldKind::InvertedFlags(slots) => {
                let set = self.flag_set(spec, slots)?;
                self.wrap(name, set.to_inverted_bytes())
            }
            FieldKind::FlagByte { on } => Ok(vec![if self.bool(name)? { on } else { 0x00 }]),
            FieldKind::Unsigned(width) => {
                let value = self.int(name)?;
                self.wrap(name, encode_unsigned_int(value as i128, width))
            }
            FieldKind::Signed(width) => {
                let value = self.int(name)?;
                self.wrap(name, encode_signed_int(value as i128, width))
            }
            FieldKind::Float32 => {
                let value = self.float(name)?;
                Ok(self.wrap(name, encode_float32(value))?.to_vec())
            }
            FieldKind::Float64 => {
                let value = self.float(name)?;
                Ok(self.wrap(name, encode_float64(value))?.to_vec())
            }
            FieldKind::Ascii(len) => {
                let text = self.text(name)?;
                self.wrap(name, encode_fixed_ascii(&text, len))
            }
            FieldKind::Coordinates(len) => {
                let mut bytes = self.coordinate(LATITUDE_KEY, len)?;
                bytes.extend(self.coordinate(LONGITUDE_KEY, len)?);
                Ok(bytes)
            }
            FieldKind::Padding(len) => Ok(vec![0u8; len]),
        }
    }
}

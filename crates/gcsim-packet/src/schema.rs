//! Packet kinds and their static layouts.
//!
//! ## Packet Format
//!
//! | Field   | Size (bytes)      | Description                                    |
//! |---------|-------------------|------------------------------------------------|
//! | id      | 1                 | [`PacketKind::id`]                             |
//! | rssi    | 4 (optional)      | f32, only when link metadata is included       |
//! | snr     | 4 (optional)      | f32, only when link metadata is included       |
//! | fields  | fixed per kind    | Schema fields in order, see [`PacketKind::schema`] |
//!
//! | Kind                          | ID   | Origin | Field bytes |
//! |-------------------------------|------|--------|-------------|
//! | `GCS_TO_AV_STATE_CMD`         | 0x01 | GCS    | 3           |
//! | `GCS_TO_GSE_STATE_CMD`        | 0x02 | GCS    | 3           |
//! | `AV_TO_GCS_DATA_1`            | 0x03 | AV     | 31          |
//! | `AV_TO_GCS_DATA_2`            | 0x04 | AV     | 49          |
//! | `AV_TO_GCS_DATA_3`            | 0x05 | AV     | 31          |
//! | `GSE_TO_GCS_DATA_1`           | 0x06 | GSE    | 31          |
//! | `GSE_TO_GCS_DATA_2`           | 0x07 | GSE    | 31          |
//! | `GCS_TO_GSE_MANUAL_CONTROL`   | 0x09 | GCS    | 3           |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::flags::{layout_width, FlagSlot};
use crate::{FieldValue, PacketError};

/// Key of the RSSI link metadata value.
pub const RSSI_KEY: &str = "rssi";
/// Key of the SNR link metadata value.
pub const SNR_KEY: &str = "snr";

/// Key of the GPS latitude value.
pub const LATITUDE_KEY: &str = "gps_latitude";
/// Key of the GPS longitude value.
pub const LONGITUDE_KEY: &str = "gps_longitude";

/// Width of each GPS coordinate text.
pub const COORDINATE_LEN: usize = 15;

/// Navigation status codes reported by the GPS receiver.
pub const NAVIGATION_STATUSES: [&str; 8] = ["NF", "DR", "G2", "G3", "D2", "D3", "RK", "TT"];

const DEFAULT_LATITUDE: &str = "-37.80808500000";
const DEFAULT_LONGITUDE: &str = "144.96507800000";

// ============================================================================
// Devices and Kinds
// ============================================================================

/// Device a packet originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    /// Avionics flight computer.
    Av,
    /// Ground support equipment.
    Gse,
    /// Ground control station.
    Gcs,
}

impl Device {
    /// All devices.
    pub const ALL: [Device; 3] = [Device::Av, Device::Gse, Device::Gcs];

    /// Short upper-case name.
    pub const fn name(&self) -> &'static str {
        match self {
            Device::Av => "AV",
            Device::Gse => "GSE",
            Device::Gcs => "GCS",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight packet kinds on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PacketKind {
    /// Continuity test and broadcast command to the AV.
    #[serde(rename = "GCS_TO_AV_STATE_CMD")]
    GcsToAvStateCmd,
    /// State command to the GSE.
    #[serde(rename = "GCS_TO_GSE_STATE_CMD")]
    GcsToGseStateCmd,
    /// AV inertial, altitude and continuity telemetry.
    #[serde(rename = "AV_TO_GCS_DATA_1")]
    AvToGcsData1,
    /// AV GPS and attitude telemetry.
    #[serde(rename = "AV_TO_GCS_DATA_2")]
    AvToGcsData2,
    /// AV state flags with reserved space.
    #[serde(rename = "AV_TO_GCS_DATA_3")]
    AvToGcsData3,
    /// GSE pressure and temperature telemetry.
    #[serde(rename = "GSE_TO_GCS_DATA_1")]
    GseToGcsData1,
    /// GSE environment and power telemetry.
    #[serde(rename = "GSE_TO_GCS_DATA_2")]
    GseToGcsData2,
    /// Manual override command to the GSE. Same layout as the state command.
    #[serde(rename = "GCS_TO_GSE_MANUAL_CONTROL")]
    GcsToGseManualControl,
}

impl PacketKind {
    /// All kinds in ID order.
    pub const ALL: [PacketKind; 8] = [
        PacketKind::GcsToAvStateCmd,
        PacketKind::GcsToGseStateCmd,
        PacketKind::AvToGcsData1,
        PacketKind::AvToGcsData2,
        PacketKind::AvToGcsData3,
        PacketKind::GseToGcsData1,
        PacketKind::GseToGcsData2,
        PacketKind::GcsToGseManualControl,
    ];

    /// Kinds sent towards the GCS.
    pub const TELEMETRY: [PacketKind; 5] = [
        PacketKind::AvToGcsData1,
        PacketKind::AvToGcsData2,
        PacketKind::AvToGcsData3,
        PacketKind::GseToGcsData1,
        PacketKind::GseToGcsData2,
    ];

    /// Wire ID byte.
    pub const fn id(&self) -> u8 {
        match self {
            PacketKind::GcsToAvStateCmd => 0x01,
            PacketKind::GcsToGseStateCmd => 0x02,
            PacketKind::AvToGcsData1 => 0x03,
            PacketKind::AvToGcsData2 => 0x04,
            PacketKind::AvToGcsData3 => 0x05,
            PacketKind::GseToGcsData1 => 0x06,
            PacketKind::GseToGcsData2 => 0x07,
            PacketKind::GcsToGseManualControl => 0x09,
        }
    }

    /// Look up a kind by its wire ID.
    pub fn from_id(id: u8) -> Result<Self, PacketError> {
        PacketKind::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or(PacketError::UnknownPacketId(id))
    }

    /// Device that sends this kind.
    pub const fn origin(&self) -> Device {
        match self {
            PacketKind::AvToGcsData1 | PacketKind::AvToGcsData2 | PacketKind::AvToGcsData3 => {
                Device::Av
            }
            PacketKind::GseToGcsData1 | PacketKind::GseToGcsData2 => Device::Gse,
            PacketKind::GcsToAvStateCmd
            | PacketKind::GcsToGseStateCmd
            | PacketKind::GcsToGseManualControl => Device::Gcs,
        }
    }

    /// Upper snake case name.
    pub const fn name(&self) -> &'static str {
        match self {
            PacketKind::GcsToAvStateCmd => "GCS_TO_AV_STATE_CMD",
            PacketKind::GcsToGseStateCmd => "GCS_TO_GSE_STATE_CMD",
            PacketKind::AvToGcsData1 => "AV_TO_GCS_DATA_1",
            PacketKind::AvToGcsData2 => "AV_TO_GCS_DATA_2",
            PacketKind::AvToGcsData3 => "AV_TO_GCS_DATA_3",
            PacketKind::GseToGcsData1 => "GSE_TO_GCS_DATA_1",
            PacketKind::GseToGcsData2 => "GSE_TO_GCS_DATA_2",
            PacketKind::GcsToGseManualControl => "GCS_TO_GSE_MANUAL_CONTROL",
        }
    }

    /// SNR reported when no value is supplied.
    pub const fn default_snr(&self) -> f64 {
        match self {
            PacketKind::GcsToAvStateCmd
            | PacketKind::GcsToGseStateCmd
            | PacketKind::GcsToGseManualControl => 69.0,
            PacketKind::AvToGcsData1 => 61.0,
            PacketKind::AvToGcsData2 => 62.0,
            PacketKind::AvToGcsData3 => 63.0,
            PacketKind::GseToGcsData1 => 71.0,
            PacketKind::GseToGcsData2 => 72.0,
        }
    }

    /// Ordered field layout.
    pub const fn schema(&self) -> &'static [FieldSpec] {
        match self {
            PacketKind::GcsToAvStateCmd => GCS_TO_AV_STATE_CMD,
            PacketKind::GcsToGseStateCmd | PacketKind::GcsToGseManualControl => GCS_TO_GSE_STATE_CMD,
            PacketKind::AvToGcsData1 => AV_TO_GCS_DATA_1,
            PacketKind::AvToGcsData2 => AV_TO_GCS_DATA_2,
            PacketKind::AvToGcsData3 => AV_TO_GCS_DATA_3,
            PacketKind::GseToGcsData1 => GSE_TO_GCS_DATA_1,
            PacketKind::GseToGcsData2 => GSE_TO_GCS_DATA_2,
        }
    }

    /// Payload length in bytes, ID included.
    pub fn payload_len(&self, include_meta: bool) -> usize {
        let meta = if include_meta { 8 } else { 0 };
        1 + meta + self.schema().iter().map(FieldSpec::byte_len).sum::<usize>()
    }

    /// Number of fragments the layout is made of.
    ///
    /// Each padding byte counts as its own fragment.
    pub fn fragment_count(&self) -> usize {
        self.schema().iter().map(FieldSpec::fragment_count).sum()
    }

    /// Every value name this kind accepts, link metadata excluded.
    pub fn value_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for spec in self.schema() {
            for name in spec.value_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Returns true if `name` is a value of this kind or link metadata.
    pub fn accepts(&self, name: &str) -> bool {
        name == RSSI_KEY || name == SNR_KEY || self.value_names().contains(&name)
    }

    /// Value used for `name` when none is supplied.
    pub fn default_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            RSSI_KEY => return Some(FieldValue::Float(0.0)),
            SNR_KEY => return Some(FieldValue::Float(self.default_snr())),
            _ => {}
        }
        self.schema().iter().find_map(|spec| spec.default_for(name))
    }
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PacketKind {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        PacketKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| PacketError::UnknownPacketName(s.to_string()))
    }
}

// ============================================================================
// Field Specifications
// ============================================================================

/// Encoding of one schema field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Packed flag byte(s).
    Flags(&'static [FlagSlot]),
    /// Complement of a packed flag layout.
    InvertedFlags(&'static [FlagSlot]),
    /// One byte that is `on` when the value is true and zero otherwise.
    FlagByte {
        /// Byte written for true.
        on: u8,
    },
    /// Unsigned integer of the given byte width.
    Unsigned(usize),
    /// Two's complement integer of the given byte width.
    Signed(usize),
    /// IEEE754 single.
    Float32,
    /// IEEE754 double.
    Float64,
    /// Fixed length ASCII text.
    Ascii(usize),
    /// Latitude then longitude, each fixed length ASCII.
    Coordinates(usize),
    /// Zero bytes reserved for future use.
    Padding(usize),
}

/// Const-friendly default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// No single default (flag layouts, coordinates, padding).
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(&'static str),
}

impl Scalar {
    fn to_value(self) -> Option<FieldValue> {
        match self {
            Scalar::None => None,
            Scalar::Bool(v) => Some(FieldValue::Bool(v)),
            Scalar::Int(v) => Some(FieldValue::Int(v)),
            Scalar::Float(v) => Some(FieldValue::Float(v)),
            Scalar::Text(v) => Some(FieldValue::Text(v.to_string())),
        }
    }
}

/// A named field of a packet schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field name. Scalar fields are looked up by this name.
    pub name: &'static str,
    /// How the field is encoded.
    pub kind: FieldKind,
    /// Default for scalar fields.
    pub default: Scalar,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind, default: Scalar) -> Self {
        FieldSpec {
            name,
            kind,
            default,
        }
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        match self.kind {
            FieldKind::Flags(slots) | FieldKind::InvertedFlags(slots) => {
                (layout_width(slots) / 8) as usize
            }
            FieldKind::FlagByte { .. } => 1,
            FieldKind::Unsigned(width) | FieldKind::Signed(width) => width,
            FieldKind::Float32 => 4,
            FieldKind::Float64 => 8,
            FieldKind::Ascii(len) | FieldKind::Padding(len) => len,
            FieldKind::Coordinates(len) => 2 * len,
        }
    }

    /// Number of fragments this field contributes.
    pub fn fragment_count(&self) -> usize {
        match self.kind {
            FieldKind::Padding(len) => len,
            _ => 1,
        }
    }

    /// Value names read by this field.
    pub fn value_names(&self) -> Vec<&'static str> {
        match self.kind {
            FieldKind::Flags(slots) | FieldKind::InvertedFlags(slots) => {
                slots.iter().filter_map(FlagSlot::name).collect()
            }
            FieldKind::Coordinates(_) => vec![LATITUDE_KEY, LONGITUDE_KEY],
            FieldKind::Padding(_) => Vec::new(),
            _ => vec![self.name],
        }
    }

    fn default_for(&self, name: &str) -> Option<FieldValue> {
        match self.kind {
            FieldKind::Flags(slots) | FieldKind::InvertedFlags(slots) => {
                slots.iter().find_map(|slot| match *slot {
                    FlagSlot::Flag { name: n, default } if n == name => {
                        Some(FieldValue::Bool(default))
                    }
                    FlagSlot::Bits {
                        name: n, default, ..
                    } if n == name => Some(FieldValue::Int(default as i64)),
                    _ => None,
                })
            }
            FieldKind::Coordinates(_) => match name {
                LATITUDE_KEY => Some(FieldValue::Text(DEFAULT_LATITUDE.to_string())),
                LONGITUDE_KEY => Some(FieldValue::Text(DEFAULT_LONGITUDE.to_string())),
                _ => None,
            },
            FieldKind::Padding(_) => None,
            _ if self.name == name => self.default.to_value(),
            _ => None,
        }
    }
}

const fn flags(name: &'static str, slots: &'static [FlagSlot]) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Flags(slots), Scalar::None)
}

const fn inverted(name: &'static str, slots: &'static [FlagSlot]) -> FieldSpec {
    FieldSpec::new(name, FieldKind::InvertedFlags(slots), Scalar::None)
}

const fn flag_byte(name: &'static str, on: u8, default: bool) -> FieldSpec {
    FieldSpec::new(name, FieldKind::FlagByte { on }, Scalar::Bool(default))
}

const fn signed(name: &'static str, width: usize, default: i64) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Signed(width), Scalar::Int(default))
}

const fn unsigned(name: &'static str, width: usize, default: i64) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Unsigned(width), Scalar::Int(default))
}

const fn float32(name: &'static str, default: f64) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Float32, Scalar::Float(default))
}

const fn ascii(name: &'static str, len: usize, default: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Ascii(len), Scalar::Text(default))
}

const fn padding(len: usize) -> FieldSpec {
    FieldSpec::new("reserved", FieldKind::Padding(len), Scalar::None)
}

// ============================================================================
// Flag Layouts
// ============================================================================

const AV_STATE_FLAGS: &[FlagSlot] = &[
    FlagSlot::bits("flight_state", 3, 0),
    FlagSlot::flag("dual_board_connectivity_state_flag", false),
    FlagSlot::flag("recovery_checks_complete_and_flight_ready", false),
    FlagSlot::flag("gps_fix_flag", false),
    FlagSlot::flag("payload_connection_flag", true),
    FlagSlot::flag("camera_controller_connection_flag", true),
];

const APOGEE_CONTINUITY: &[FlagSlot] = &[
    FlagSlot::flag("apogee_primary_test_complete", true),
    FlagSlot::flag("apogee_secondary_test_complete", false),
    FlagSlot::marker(),
    FlagSlot::flag("apogee_primary_test_results", false),
    FlagSlot::flag("apogee_secondary_test_results", false),
];

const MAIN_CONTINUITY: &[FlagSlot] = &[
    FlagSlot::flag("main_primary_test_complete", true),
    FlagSlot::flag("main_secondary_test_complete", false),
    FlagSlot::marker(),
    FlagSlot::flag("main_primary_test_results", false),
    FlagSlot::flag("main_secondary_test_results", false),
];

const CONTINUITY_COMMAND: &[FlagSlot] = &[
    FlagSlot::marker(),
    FlagSlot::flag("main_secondary_test", false),
    FlagSlot::flag("main_primary_test", true),
    FlagSlot::flag("apogee_secondary_test", false),
    FlagSlot::flag("apogee_primary_test", false),
];

const GSE_COMMAND_FLAGS: &[FlagSlot] = &[
    FlagSlot::flag("manual_purge_activate", false),
    FlagSlot::flag("o2_fill_activate", true),
    FlagSlot::flag("selector_switch_neutral_position", false),
    FlagSlot::flag("n2o_fill_activate", false),
    FlagSlot::flag("ignition_fire", false),
    FlagSlot::flag("ignition_selected", false),
    FlagSlot::flag("gas_fill_selected", false),
    FlagSlot::flag("system_activate", false),
];

const GSE_STATE_FLAGS: &[FlagSlot] = &[
    FlagSlot::flag("manual_purge_activated", false),
    FlagSlot::flag("o2_fill_activated", false),
    FlagSlot::flag("selector_switch_neutral_position", false),
    FlagSlot::flag("n2o_fill_activated", false),
    FlagSlot::flag("ignition_fired", true),
    FlagSlot::flag("ignition_selected", false),
    FlagSlot::flag("gas_fill_selected", false),
    FlagSlot::flag("system_activated", false),
];

const GSE_ERROR_CODE: &[FlagSlot] = &[
    FlagSlot::flag("ignition_error", false),
    FlagSlot::flag("relay_3_error", false),
    FlagSlot::flag("relay_2_error", true),
    FlagSlot::flag("relay_1_error", false),
    FlagSlot::flag("thermocouple_4_error", false),
    FlagSlot::flag("thermocouple_3_error", false),
    FlagSlot::flag("thermocouple_2_error", true),
    FlagSlot::flag("thermocouple_1_error", false),
    FlagSlot::flag("load_cell_4_error", false),
    FlagSlot::flag("load_cell_3_error", false),
    FlagSlot::flag("load_cell_2_error", false),
    FlagSlot::flag("load_cell_1_error", false),
    FlagSlot::flag("transducer_4_error", false),
    FlagSlot::flag("transducer_3_error", false),
    FlagSlot::flag("transducer_2_error", false),
    FlagSlot::flag("transducer_1_error", true),
];

// ============================================================================
// Schemas
// ============================================================================

const GCS_TO_AV_STATE_CMD: &[FieldSpec] = &[
    flags("continuity_command", CONTINUITY_COMMAND),
    inverted("continuity_command_inverted", CONTINUITY_COMMAND),
    flag_byte("begin_broadcast", 0xFF, false),
];

const GCS_TO_GSE_STATE_CMD: &[FieldSpec] = &[
    flags("gse_command", GSE_COMMAND_FLAGS),
    inverted("gse_command_inverted", GSE_COMMAND_FLAGS),
    padding(1),
];

const AV_TO_GCS_DATA_1: &[FieldSpec] = &[
    flags("av_state", AV_STATE_FLAGS),
    signed("accel_low_x", 2, 2048),
    signed("accel_low_y", 2, 2048 * 2),
    signed("accel_low_z", 2, -2048 * 3),
    signed("accel_high_x", 2, -1024),
    signed("accel_high_y", 2, -1024 * 2),
    signed("accel_high_z", 2, 1024 * 3),
    signed("gyro_x", 2, 114),
    signed("gyro_y", 2, 228),
    signed("gyro_z", 2, 342),
    float32("altitude", 1234.0),
    float32("velocity", 1234.0),
    flags("apogee_continuity", APOGEE_CONTINUITY),
    flags("main_continuity", MAIN_CONTINUITY),
    flag_byte("move_to_broadcast", 0b1010_1010, false),
    padding(1),
];

const AV_TO_GCS_DATA_2: &[FieldSpec] = &[
    flags("av_state", AV_STATE_FLAGS),
    FieldSpec::new("gps", FieldKind::Coordinates(COORDINATE_LEN), Scalar::None),
    ascii("navigation_status", 2, "G2"),
    float32("quaternion_w", 0.0),
    float32("quaternion_x", 1.0),
    float32("quaternion_y", -1.0),
    float32("quaternion_z", 0.5),
];

const AV_TO_GCS_DATA_3: &[FieldSpec] = &[flags("av_state", AV_STATE_FLAGS), padding(30)];

const GSE_TO_GCS_DATA_1: &[FieldSpec] = &[
    flags("gse_state", GSE_STATE_FLAGS),
    float32("transducer_1", 0.5),
    float32("transducer_2", 1.0),
    float32("transducer_3", 1.5),
    float32("thermocouple_1", 21.23),
    float32("thermocouple_2", 32.34),
    float32("thermocouple_3", 43.45),
    float32("thermocouple_4", 54.56),
    flags("gse_error_code", GSE_ERROR_CODE),
];

const GSE_TO_GCS_DATA_2: &[FieldSpec] = &[
    flags("gse_state", GSE_STATE_FLAGS),
    float32("internal_temperature", 30.123),
    float32("wind_speed", 20.123),
    unsigned("gas_bottle_weight_1", 2, 2),
    unsigned("gas_bottle_weight_2", 2, 8),
    float32("analog_voltage_input_1", 5.123),
    float32("analog_voltage_input_2", 6.123),
    float32("additional_current_input_1", 14.123),
    float32("additional_current_input_2", 13.123),
    flags("gse_error_code", GSE_ERROR_CODE),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_and_origins() {
        let ids: Vec<u8> = PacketKind::ALL.iter().map(PacketKind::id).collect();
        assert_eq!(ids, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x09]);
        assert_eq!(PacketKind::from_id(0x09).unwrap(), PacketKind::GcsToGseManualControl);
        assert!(matches!(
            PacketKind::from_id(0x08),
            Err(PacketError::UnknownPacketId(0x08))
        ));
        assert_eq!(PacketKind::AvToGcsData2.origin(), Device::Av);
        assert_eq!(PacketKind::GseToGcsData1.origin(), Device::Gse);
        assert_eq!(PacketKind::GcsToAvStateCmd.origin(), Device::Gcs);
    }

    #[test]
    fn test_field_byte_lengths() {
        let expected = [
            (PacketKind::GcsToAvStateCmd, 3),
            (PacketKind::GcsToGseStateCmd, 3),
            (PacketKind::AvToGcsData1, 31),
            (PacketKind::AvToGcsData2, 49),
            (PacketKind::AvToGcsData3, 31),
            (PacketKind::GseToGcsData1, 31),
            (PacketKind::GseToGcsData2, 31),
            (PacketKind::GcsToGseManualControl, 3),
        ];
        for (kind, fields) in expected {
            assert_eq!(kind.payload_len(false), 1 + fields, "{}", kind);
            assert_eq!(kind.payload_len(true), 9 + fields, "{}", kind);
        }
    }

    #[test]
    fn test_fragment_counts() {
        assert_eq!(PacketKind::AvToGcsData1.fragment_count(), 16);
        assert_eq!(PacketKind::AvToGcsData2.fragment_count(), 7);
        assert_eq!(PacketKind::AvToGcsData3.fragment_count(), 31);
        assert_eq!(PacketKind::GseToGcsData1.fragment_count(), 9);
        assert_eq!(PacketKind::GseToGcsData2.fragment_count(), 10);
        assert_eq!(PacketKind::GcsToAvStateCmd.fragment_count(), 3);
        assert_eq!(PacketKind::GcsToGseManualControl.fragment_count(), 3);
    }

    #[test]
    fn test_flag_layouts_fill_whole_bytes() {
        for kind in PacketKind::ALL {
            for spec in kind.schema() {
                if let FieldKind::Flags(slots) | FieldKind::InvertedFlags(slots) = spec.kind {
                    let width = layout_width(slots);
                    assert!(width == 8 || width == 16, "{}.{}: {} bits", kind, spec.name, width);
                }
            }
        }
    }

    #[test]
    fn test_value_names_and_defaults() {
        let names = PacketKind::GcsToAvStateCmd.value_names();
        assert_eq!(
            names,
            vec![
                "main_secondary_test",
                "main_primary_test",
                "apogee_secondary_test",
                "apogee_primary_test",
                "begin_broadcast",
            ]
        );
        assert!(PacketKind::AvToGcsData2.accepts(LATITUDE_KEY));
        assert!(PacketKind::AvToGcsData3.accepts(RSSI_KEY));
        assert!(!PacketKind::AvToGcsData3.accepts("altitude"));

        let kind = PacketKind::GseToGcsData1;
        assert_eq!(kind.default_value("ignition_fired"), Some(FieldValue::Bool(true)));
        assert_eq!(kind.default_value("thermocouple_4"), Some(FieldValue::Float(54.56)));
        assert_eq!(kind.default_value(SNR_KEY), Some(FieldValue::Float(71.0)));
        assert_eq!(
            PacketKind::AvToGcsData1.default_value("flight_state"),
            Some(FieldValue::Int(0))
        );
        assert_eq!(kind.default_value("reserved"), None);
    }

    #[test]
    fn test_names_parse() {
        for kind in PacketKind::ALL {
            assert_eq!(kind.name().parse::<PacketKind>().unwrap(), kind);
        }
        assert_eq!(
            "av-to-gcs-data-1".parse::<PacketKind>().unwrap(),
            PacketKind::AvToGcsData1
        );
        assert!("AV_TO_GCS_DATA_9".parse::<PacketKind>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PacketKind::GseToGcsData2).unwrap();
        assert_eq!(json, "\"GSE_TO_GCS_DATA_2\"");
        let device: Device = serde_json::from_str("\"GSE\"").unwrap();
        assert_eq!(device, Device::Gse);
    }
}

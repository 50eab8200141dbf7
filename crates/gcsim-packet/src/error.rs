//! Error types for gcsim-packet.

use thiserror::Error;

use crate::PacketKind;

/// Broad classification of an encoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Value outside the numeric domain of its field.
    Range,
    /// Fixed-length text of the wrong length.
    Length,
    /// Unknown field name or a value of the wrong type.
    Schema,
}

/// Errors raised while encoding a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Integer outside the range of its declared width.
    #[error("integer {value} outside [{min}, {max}]")]
    IntegerRange {
        /// Offending value.
        value: i128,
        /// Smallest encodable value.
        min: i128,
        /// Largest encodable value.
        max: i128,
    },

    /// Float that is NaN, infinite, or too large for its encoding.
    #[error("float {0} is not encodable")]
    FloatRange(f64),

    /// Integer width the codec does not support.
    #[error("unsupported integer width: {0} bytes")]
    UnsupportedWidth(usize),

    /// Text containing non-ASCII characters.
    #[error("text is not ASCII: {0:?}")]
    NonAscii(String),

    /// Fixed-length text of the wrong length.
    #[error("expected {expected} characters, got {actual}")]
    Length {
        /// Declared length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Flag layout that does not fill a whole number of bytes.
    #[error("flag set is {0} bits wide, expected 8 or 16")]
    FlagWidth(u32),

    /// Value of the wrong type for the field.
    #[error("expected {expected} value, got {actual}")]
    TypeMismatch {
        /// Type the field accepts.
        expected: &'static str,
        /// Type that was supplied.
        actual: &'static str,
    },
}

impl FieldError {
    /// Create an integer range error.
    pub fn integer_range(value: i128, min: i128, max: i128) -> Self {
        FieldError::IntegerRange { value, min, max }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        FieldError::TypeMismatch { expected, actual }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FieldError::IntegerRange { .. }
            | FieldError::FloatRange(_)
            | FieldError::UnsupportedWidth(_)
            | FieldError::NonAscii(_)
            | FieldError::FlagWidth(_) => ErrorCategory::Range,
            FieldError::Length { .. } => ErrorCategory::Length,
            FieldError::TypeMismatch { .. } => ErrorCategory::Schema,
        }
    }
}

/// Errors that can occur while building a packet.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacketError {
    /// A field of the packet failed to encode.
    #[error("{kind}: field `{field}`: {source}")]
    Field {
        /// Packet being built.
        kind: PacketKind,
        /// Name of the offending field.
        field: String,
        /// Underlying field error.
        #[source]
        source: FieldError,
    },

    /// A value was supplied for a name the packet does not carry.
    #[error("{kind}: unknown field `{field}`")]
    UnknownField {
        /// Packet being built.
        kind: PacketKind,
        /// The unrecognised name.
        field: String,
    },

    /// No packet kind uses this ID.
    #[error("unknown packet id: 0x{0:02X}")]
    UnknownPacketId(u8),

    /// No packet kind has this name.
    #[error("unknown packet kind: {0}")]
    UnknownPacketName(String),
}

impl PacketError {
    /// Create a field error for the given packet.
    pub fn field(kind: PacketKind, field: impl Into<String>, source: FieldError) -> Self {
        PacketError::Field {
            kind,
            field: field.into(),
            source,
        }
    }

    /// Create an unknown field error.
    pub fn unknown_field(kind: PacketKind, field: impl Into<String>) -> Self {
        PacketError::UnknownField {
            kind,
            field: field.into(),
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PacketError::Field { source, .. } => source.category(),
            PacketError::UnknownField { .. }
            | PacketError::UnknownPacketId(_)
            | PacketError::UnknownPacketName(_) => ErrorCategory::Schema,
        }
    }

    /// Returns the packet kind the error was raised for, if any.
    pub fn kind(&self) -> Option<PacketKind> {
        match self {
            PacketError::Field { kind, .. } | PacketError::UnknownField { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

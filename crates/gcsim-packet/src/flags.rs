//! Packed boolean flag bytes.
//!
//! Flags are shifted in one at a time, so the first flag pushed ends up in
//! the most significant bit of the first byte:
//!
//! ```text
//! push(f0) push(f1) ... push(f7)  =>  [f0 f1 f2 f3 f4 f5 f6 f7]
//! ```
//!
//! Some layouts interleave the 4-bit marker `0b1010` between flag groups so a
//! misaligned stream is visible in a hex dump.

use crate::field::invert_byte;
use crate::FieldError;

/// Marker nibble embedded in continuity flag bytes.
pub const MARKER_NIBBLE: u8 = 0b1010;

/// One slot of a flag layout, in transmission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagSlot {
    /// A named boolean taking one bit.
    Flag {
        /// Value name.
        name: &'static str,
        /// Value used when none is supplied.
        default: bool,
    },
    /// A named unsigned integer packed into `width` bits.
    Bits {
        /// Value name.
        name: &'static str,
        /// Number of bits.
        width: u8,
        /// Value used when none is supplied.
        default: u8,
    },
    /// A constant bit pattern.
    Marker {
        /// Pattern, right-aligned.
        pattern: u8,
        /// Number of bits.
        width: u8,
    },
}

impl FlagSlot {
    /// Create a flag slot.
    pub const fn flag(name: &'static str, default: bool) -> Self {
        FlagSlot::Flag { name, default }
    }

    /// Create a bit-field slot.
    pub const fn bits(name: &'static str, width: u8, default: u8) -> Self {
        FlagSlot::Bits {
            name,
            width,
            default,
        }
    }

    /// The `0b1010` marker nibble.
    pub const fn marker() -> Self {
        FlagSlot::Marker {
            pattern: MARKER_NIBBLE,
            width: 4,
        }
    }

    /// Number of bits the slot occupies.
    pub const fn width(&self) -> u32 {
        match self {
            FlagSlot::Flag { .. } => 1,
            FlagSlot::Bits { width, .. } | FlagSlot::Marker { width, .. } => *width as u32,
        }
    }

    /// Value name, if the slot carries one.
    pub const fn name(&self) -> Option<&'static str> {
        match self {
            FlagSlot::Flag { name, .. } | FlagSlot::Bits { name, .. } => Some(*name),
            FlagSlot::Marker { .. } => None,
        }
    }
}

/// Total bit width of a slot layout.
pub fn layout_width(slots: &[FlagSlot]) -> u32 {
    slots.iter().map(FlagSlot::width).sum()
}

/// Accumulates flags and bit-fields MSB first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSet {
    bits: u32,
    width: u32,
}

impl FlagSet {
    /// Create an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a flag set from ordered booleans.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut set = Self::new();
        for &flag in flags {
            set.push_flag(flag);
        }
        set
    }

    /// Append one boolean.
    pub fn push_flag(&mut self, flag: bool) {
        self.push_bits(flag as u32, 1);
    }

    /// Append the low `width` bits of `value`.
    pub fn push_bits(&mut self, value: u32, width: u32) {
        let mask = (1u32 << width) - 1;
        self.bits = (self.bits << width) | (value & mask);
        self.width += width;
    }

    /// Number of bits pushed so far.
    pub fn bit_width(&self) -> u32 {
        self.width
    }

    /// Packed bytes, most significant first.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FieldError> {
        match self.width {
            8 => Ok(vec![self.bits as u8]),
            16 => Ok((self.bits as u16).to_be_bytes().to_vec()),
            other => Err(FieldError::FlagWidth(other)),
        }
    }

    /// Complement of [`FlagSet::to_bytes`].
    pub fn to_inverted_bytes(&self) -> Result<Vec<u8>, FieldError> {
        Ok(self.to_bytes()?.into_iter().map(invert_byte).collect())
    }
}

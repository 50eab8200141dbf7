//! Scalar field encoding.
//!
//! Every multi-byte value is written big-endian regardless of the host, so a
//! hex dump of a payload reads the same on every platform.

use crate::FieldError;

/// Largest magnitude representable as an IEEE754 single.
pub const FLOAT32_MAX: f64 = f32::MAX as f64;

/// Largest integer width accepted by the integer encoders.
pub const MAX_INT_WIDTH: usize = 8;

// ============================================================================
// Ranges
// ============================================================================

fn check_width(width: usize) -> Result<(), FieldError> {
    if width == 0 || width > MAX_INT_WIDTH {
        return Err(FieldError::UnsupportedWidth(width));
    }
    Ok(())
}

/// Inclusive range of an unsigned integer `width` bytes wide.
pub fn unsigned_range(width: usize) -> (i128, i128) {
    (0, (1i128 << (8 * width)) - 1)
}

/// Inclusive range of a two's complement integer `width` bytes wide.
pub fn signed_range(width: usize) -> (i128, i128) {
    let half = 1i128 << (8 * width - 1);
    (-half, half - 1)
}

/// Returns true if `value` can be written as a float32.
pub fn is_valid_float32(value: f64) -> bool {
    value.is_finite() && value.abs() <= FLOAT32_MAX
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Encode a boolean as a single byte (`0x01` or `0x00`).
pub fn encode_bool(value: bool) -> [u8; 1] {
    [value as u8]
}

/// Encode an unsigned integer into `width` big-endian bytes.
pub fn encode_unsigned_int(value: i128, width: usize) -> Result<Vec<u8>, FieldError> {
    check_width(width)?;
    let (min, max) = unsigned_range(width);
    if value < min || value > max {
        return Err(FieldError::integer_range(value, min, max));
    }
    Ok(value.to_be_bytes()[16 - width..].to_vec())
}

/// Encode a signed integer into `width` big-endian two's complement bytes.
pub fn encode_signed_int(value: i128, width: usize) -> Result<Vec<u8>, FieldError> {
    check_width(width)?;
    let (min, max) = signed_range(width);
    if value < min || value > max {
        return Err(FieldError::integer_range(value, min, max));
    }
    Ok(value.to_be_bytes()[16 - width..].to_vec())
}

/// Encode a value as a big-endian IEEE754 single.
pub fn encode_float32(value: f64) -> Result<[u8; 4], FieldError> {
    if !is_valid_float32(value) {
        return Err(FieldError::FloatRange(value));
    }
    Ok((value as f32).to_be_bytes())
}

/// Encode a value as a big-endian IEEE754 double.
pub fn encode_float64(value: f64) -> Result<[u8; 8], FieldError> {
    if !value.is_finite() {
        return Err(FieldError::FloatRange(value));
    }
    Ok(value.to_be_bytes())
}

/// Encode text that must be exactly `length` ASCII characters.
///
/// No padding or truncation is applied.
pub fn encode_fixed_ascii(value: &str, length: usize) -> Result<Vec<u8>, FieldError> {
    if !value.is_ascii() {
        return Err(FieldError::NonAscii(value.to_string()));
    }
    if value.len() != length {
        return Err(FieldError::Length {
            expected: length,
            actual: value.len(),
        });
    }
    Ok(value.as_bytes().to_vec())
}

/// Bitwise complement of a byte.
pub const fn invert_byte(byte: u8) -> u8 {
    !byte
}

/// Render a coordinate in decimal degrees as exactly `length` characters.
///
/// The integer part is kept and the fraction is given every remaining
/// character, e.g. `-37.808085` becomes `-37.80808500000` at length 15.
pub fn format_coordinate(value: f64, length: usize) -> Result<String, FieldError> {
    if !value.is_finite() {
        return Err(FieldError::FloatRange(value));
    }
    // fold -0.0 so it does not render with a sign
    let value = if value == 0.0 { 0.0 } else { value };
    let sign = if value < 0.0 { "-" } else { "" };
    let whole = format!("{}{}", sign, value.abs().trunc());
    // whole digits, the point, and at least one decimal
    if whole.len() + 2 > length {
        return Err(FieldError::FloatRange(value));
    }
    let precision = length - whole.len() - 1;
    let text = format!("{:.*}", precision, value);
    if text.len() != length {
        // rounding carried into a new integer digit
        return Err(FieldError::Length {
            expected: length,
            actual: text.len(),
        });
    }
    Ok(text)
}

//! Random bit-flip corruption of generated values.
//!
//! Models a noisy radio link: with probability `chance` a packet is hit, an
//! intensity `c` is drawn from `[0, max_intensity)`, and every bool, int and
//! float value has each bit of its raw pattern flipped with probability `c`.
//!
//! | Type  | Pattern            | Result                                         |
//! |-------|--------------------|------------------------------------------------|
//! | bool  | 8 bits             | true when any bit is set                       |
//! | int   | 32-bit two's compl.| unsigned, masked to the magnitude's bit length |
//! | float | f32 bits           | NaN or infinity becomes the largest f32        |
//! | text  | -                  | untouched                                      |
//!
//! Corruption never fails. A value whose drawn mask is empty is left exactly
//! as it was.

use gcsim_packet::field::FLOAT32_MAX;
use gcsim_packet::{FieldValue, FieldValues};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use serde::Deserialize;

use crate::error::check_unit;
use crate::TelemetryError;

/// Corruption parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawCorruptionConfig")]
pub struct CorruptionConfig {
    chance: f64,
    max_intensity: f64,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawCorruptionConfig {
    chance: f64,
    max_intensity: f64,
}

impl Default for RawCorruptionConfig {
    fn default() -> Self {
        let CorruptionConfig {
            chance,
            max_intensity,
        } = CorruptionConfig::default();
        RawCorruptionConfig {
            chance,
            max_intensity,
        }
    }
}

impl TryFrom<RawCorruptionConfig> for CorruptionConfig {
    type Error = TelemetryError;

    fn try_from(raw: RawCorruptionConfig) -> Result<Self, Self::Error> {
        CorruptionConfig::new(raw.chance, raw.max_intensity)
    }
}

impl CorruptionConfig {
    /// Create a config; both parameters must lie in `[0, 1]`.
    pub fn new(chance: f64, max_intensity: f64) -> Result<Self, TelemetryError> {
        Ok(CorruptionConfig {
            chance: check_unit("corruption chance", chance)?,
            max_intensity: check_unit("corruption max_intensity", max_intensity)?,
        })
    }

    /// Probability that a packet is corrupted at all.
    pub fn chance(&self) -> f64 {
        self.chance
    }

    /// Upper bound of the per-bit flip probability.
    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }
}

impl Default for CorruptionConfig {
    fn default() -> Self {
        CorruptionConfig {
            chance: 0.01,
            max_intensity: 0.3,
        }
    }
}

/// Applies random bit flips to named values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorruptionInjector {
    config: CorruptionConfig,
}

impl CorruptionInjector {
    /// Create an injector.
    pub fn new(config: CorruptionConfig) -> Self {
        CorruptionInjector { config }
    }

    /// The parameters in use.
    pub fn config(&self) -> &CorruptionConfig {
        &self.config
    }

    /// Possibly corrupt `values` in place. Returns how many values changed.
    pub fn corrupt<R: Rng + ?Sized>(&self, values: &mut FieldValues, rng: &mut R) -> usize {
        if self.config.chance == 0.0 || rng.gen::<f64>() >= self.config.chance {
            return 0;
        }
        let intensity = rng.gen::<f64>() * self.config.max_intensity;
        let Ok(bits) = Bernoulli::new(intensity) else {
            return 0;
        };

        let mut changed = 0;
        for (name, value) in values.iter_mut() {
            let corrupted = match value {
                FieldValue::Bool(v) => {
                    let mask = draw_mask(&bits, 8, rng) as u8;
                    (mask != 0).then(|| FieldValue::Bool(flip_bool(*v, mask)))
                }
                FieldValue::Int(v) => {
                    let mask = draw_mask(&bits, 32, rng);
                    (mask != 0).then(|| FieldValue::Int(flip_int(*v, mask)))
                }
                FieldValue::Float(v) => {
                    let mask = draw_mask(&bits, 32, rng);
                    (mask != 0).then(|| FieldValue::Float(flip_float(*v, mask)))
                }
                FieldValue::Text(_) => None,
            };
            if let Some(new_value) = corrupted {
                tracing::trace!("corrupted {}: {} -> {}", name, value, new_value);
                *value = new_value;
                changed += 1;
            }
        }

        tracing::debug!(
            "corruption intensity {:.3} changed {} of {} values",
            intensity,
            changed,
            values.len()
        );
        changed
    }
}

fn draw_mask<R: Rng + ?Sized>(bits: &Bernoulli, width: u32, rng: &mut R) -> u32 {
    (0..width).fold(0u32, |mask, _| (mask << 1) | bits.sample(rng) as u32)
}

/// Flip bits of a bool's byte; any set bit reads back as true.
pub fn flip_bool(value: bool, mask: u8) -> bool {
    (value as u8 ^ mask) != 0
}

/// Flip bits of an integer's 32-bit pattern, keeping only as many low bits
/// as the original magnitude needs. The result is read back unsigned, so it
/// is never negative.
pub fn flip_int(value: i64, mask: u32) -> i64 {
    let flipped = (value as i32 as u32) ^ mask;
    let bit_length = u64::BITS - value.unsigned_abs().leading_zeros();
    let keep = match bit_length {
        32.. => u32::MAX,
        n => (1u32 << n) - 1,
    };
    (flipped & keep) as i64
}

/// Flip bits of a float's f32 pattern; non-finite results clamp to the
/// largest f32.
pub fn flip_float(value: f64, mask: u32) -> f64 {
    let flipped = f32::from_bits((value as f32).to_bits() ^ mask) as f64;
    if flipped.is_finite() {
        flipped
    } else {
        FLOAT32_MAX
    }
}

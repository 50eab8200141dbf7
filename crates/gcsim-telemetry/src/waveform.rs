//! Time-driven signal generators.
//!
//! All generators are pure functions of `t` except the noisy sinusoid, which
//! draws one uniform sample per call from the caller's RNG.

use rand::Rng;
use std::f64::consts::TAU;

/// Sinusoid swinging between `min` and `max`.
pub fn sinusoid(t: f64, min: f64, max: f64, period: f64, phase: f64) -> f64 {
    let amplitude = (max - min) / 2.0;
    let offset = (max + min) / 2.0;
    amplitude * (TAU * t / period + phase).sin() + offset
}

/// Sinusoid with jitter controlled by `noise` (a coefficient in `[0, 1]`).
///
/// The clean signal is contracted by `1 - noise` and jitter of up to
/// `noise² · amplitude` is added on top, so for `noise > 0` the output may
/// leave `[min, max]`. At `noise == 0` no sample is drawn.
pub fn noisy_sinusoid<R: Rng + ?Sized>(
    t: f64,
    min: f64,
    max: f64,
    period: f64,
    phase: f64,
    noise: f64,
    rng: &mut R,
) -> f64 {
    let base = sinusoid(t, min, max, period, phase);
    if noise == 0.0 {
        return base;
    }
    let amplitude = (max - min) / 2.0;
    let jitter = noise * rng.gen::<f64>() * amplitude * noise;
    base * (1.0 - noise) + jitter
}

/// Integer stepping through `min..=max`, one step every `period` seconds.
pub fn changing_int(t: f64, min: i64, max: i64, period: f64) -> i64 {
    let span = max - min + 1;
    let step = (t / period).floor() as i64;
    min + step.rem_euclid(span)
}

/// Boolean that is false for `period` seconds, then true for `period` seconds.
pub fn changing_bool(t: f64, period: f64) -> bool {
    t.rem_euclid(2.0 * period) > period
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    #[test]
    fn test_sinusoid_extremes() {
        assert_relative_eq!(sinusoid(0.0, 0.0, 10.0, 10.0, 0.0), 5.0);
        assert_relative_eq!(sinusoid(2.5, 0.0, 10.0, 10.0, 0.0), 10.0);
        assert_relative_eq!(sinusoid(7.5, 0.0, 10.0, 10.0, 0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(sinusoid(0.0, 0.0, 10.0, 10.0, PI / 2.0), 10.0);
    }

    #[test]
    fn test_sinusoid_is_bounded() {
        let mut t = -50.0;
        while t < 50.0 {
            let v = sinusoid(t, -15.9, 15.9, 5.0, 2.0 * PI / 3.0);
            assert!((-15.9 - 1e-9..=15.9 + 1e-9).contains(&v), "t={} v={}", t, v);
            t += 0.037;
        }
    }

    #[test]
    fn test_zero_noise_is_clean() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for i in 0..100 {
            let t = i as f64 * 0.1;
            assert_eq!(
                noisy_sinusoid(t, 0.0, 3000.0, 40.0, 0.0, 0.0, &mut rng),
                sinusoid(t, 0.0, 3000.0, 40.0, 0.0)
            );
        }
    }

    #[test]
    fn test_noise_contracts_and_jitters() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let k = 0.5;
        for i in 0..200 {
            let t = i as f64 * 0.05;
            let clean = sinusoid(t, -1.0, 1.0, 3.0, 0.0);
            let v = noisy_sinusoid(t, -1.0, 1.0, 3.0, 0.0, k, &mut rng);
            let jitter = v - clean * (1.0 - k);
            assert!((0.0..=k * k).contains(&jitter), "jitter {}", jitter);
        }
    }

    #[test]
    fn test_changing_int_cycles() {
        let seen: Vec<i64> = (0..10).map(|i| changing_int(i as f64 + 0.5, 0, 7, 1.0)).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
        assert_eq!(changing_int(4.0, 3, 5, 2.0), 5);
        assert_eq!(changing_int(6.0, 3, 5, 2.0), 3);
        assert_eq!(changing_int(-0.5, 0, 7, 1.0), 7);
    }

    #[test]
    fn test_changing_bool_alternates() {
        assert!(!changing_bool(0.5, 1.0));
        assert!(changing_bool(1.5, 1.0));
        assert!(!changing_bool(2.5, 1.0));
        assert!(changing_bool(3.5, 1.0));
        assert!(changing_bool(0.75, 0.5));
    }
}

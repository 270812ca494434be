//! Seeded draw helpers shared by the strategies.

use rand::{rngs::StdRng, Rng};

/// Inclusive uniform draw over `[min, max]`.
///
/// The naive `max - min + 1` width overflows when the range spans more than
/// half the `i64` domain, so the width is computed in 128 bits. When the
/// range size exceeds `u64` (only possible for near-full-domain ranges) the
/// draw falls back to rejection sampling over raw `i64`s; the acceptance
/// probability is at least one half there, so the loop terminates quickly.
pub fn next_long_inclusive(rng: &mut StdRng, min: i64, max: i64) -> i64 {
    debug_assert!(min <= max);
    if min == max {
        return min;
    }
    let width = (i128::from(max) - i128::from(min)) as u128 + 1;
    if let Ok(width) = u64::try_from(width) {
        let offset = rng.random_range(0..width);
        (i128::from(min) + i128::from(offset)) as i64
    } else {
        loop {
            let candidate = rng.random::<i64>();
            if candidate >= min && candidate <= max {
                return candidate;
            }
        }
    }
}

/// Inclusive uniform draw over `[min, max]` for doubles. Both bounds are
/// attainable; non-finite bounds are clamped to the finite domain.
pub fn next_double_inclusive(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    let min = if min.is_finite() { min } else { f64::MIN };
    let max = if max.is_finite() { max } else { f64::MAX };
    if min >= max {
        return min;
    }
    let unit = rng.random::<f64>();
    // Interpolating via the midpoint keeps the arithmetic finite even when
    // the bounds sit at the edges of the domain.
    let mid = min / 2.0 + max / 2.0;
    let value = if unit < 0.5 {
        min + (mid - min) * (unit * 2.0)
    } else {
        mid + (max - mid) * ((unit - 0.5) * 2.0)
    };
    value.clamp(min, max)
}

/// Bernoulli draw used for the 10% edge-case bias.
pub fn chance(rng: &mut StdRng, probability: f64) -> bool {
    rng.random_bool(probability)
}

//! Value noise and separable box smoothing over square fields.

use rand::RngCore;

use crate::rng::unit_draw;

/// One independent draw per cell, row-major.
pub fn value_noise(width: usize, height: usize, rng: &mut dyn RngCore) -> Vec<f64> {
    (0..width * height).map(|_| unit_draw(rng)).collect()
}

/// Smooth a `size × size` field in place with `passes` rounds of a
/// 3-neighbourhood average, horizontal then vertical. Out-of-range neighbours
/// are dropped from the average instead of wrapping.
pub fn blur(field: &mut [f64], size: usize, passes: u32) {
    if size == 0 || field.len() < size * size {
        return;
    }
    let mut scratch = vec![0.0; size * size];
    for _ in 0..passes {
        for y in 0..size {
            let row = y * size;
            for x in 0..size {
                let lo = x.saturating_sub(1);
                let hi = (x + 1).min(size - 1);
                let sum: f64 = field[row + lo..=row + hi].iter().sum();
                scratch[row + x] = sum / (hi - lo + 1) as f64;
            }
        }
        for y in 0..size {
            let lo = y.saturating_sub(1);
            let hi = (y + 1).min(size - 1);
            let taps = (hi - lo + 1) as f64;
            for x in 0..size {
                let sum: f64 = (lo..=hi).map(|yy| scratch[yy * size + x]).sum();
                field[y * size + x] = sum / taps;
            }
        }
    }
}

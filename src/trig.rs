//! Table-based trigonometry for per-frame uniform math.
//!
//! The binder evaluates a handful of sines and cosines per light per frame
//! (spot cone cosines mostly). A 256-entry lookup table with first-order
//! correction is plenty accurate for cone tests while staying branch-free.

use std::f32::consts::{PI, TAU};
use std::sync::LazyLock;

const TABLE_SIZE: usize = 256;
const TABLE_MASK: usize = TABLE_SIZE - 1;

static SINE_TABLE: LazyLock<[f32; TABLE_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0f32; TABLE_SIZE];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (i as f32 * TAU / TABLE_SIZE as f32).sin();
    }
    table
});

/// Fast sine with linear correction from the lookup table.
///
/// Accurate to roughly 1e-4 over a few turns either side of zero, which is
/// far below what cone-angle comparisons can observe.
#[must_use]
pub fn fast_sin(x: f32) -> f32 {
    let table = &*SINE_TABLE;
    let si = (x * (0.5 * TABLE_SIZE as f32 / PI)).floor() as i32;
    let d = x - si as f32 * (TAU / TABLE_SIZE as f32);
    let ci = (si as usize).wrapping_add(TABLE_SIZE / 4) & TABLE_MASK;
    let si = (si as usize) & TABLE_MASK;
    table[si] + (table[ci] - 0.5 * table[si] * d) * d
}

/// Fast cosine; see [`fast_sin`].
#[must_use]
pub fn fast_cos(x: f32) -> f32 {
    let table = &*SINE_TABLE;
    let ci = (x * (0.5 * TABLE_SIZE as f32 / PI)).floor() as i32;
    let d = x - ci as f32 * (TAU / TABLE_SIZE as f32);
    let si = (ci as usize).wrapping_add(TABLE_SIZE / 4) & TABLE_MASK;
    let ci = (ci as usize) & TABLE_MASK;
    table[si] - (table[ci] + 0.5 * table[si] * d) * d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_reference_sin_within_tolerance() {
        let mut theta = -2.0 * TAU;
        while theta < 2.0 * TAU {
            let err = (fast_sin(theta) - theta.sin()).abs();
            assert!(err < 1e-3, "sin error {err} at theta {theta}");
            theta += 0.013;
        }
    }

    #[test]
    fn tracks_reference_cos_within_tolerance() {
        let mut theta = -2.0 * TAU;
        while theta < 2.0 * TAU {
            let err = (fast_cos(theta) - theta.cos()).abs();
            assert!(err < 1e-3, "cos error {err} at theta {theta}");
            theta += 0.013;
        }
    }

    #[test]
    fn cone_angle_cosines_order_correctly() {
        // Spot lighting only needs the cosine to stay monotonic across
        // plausible cone angles.
        let outer = fast_cos(60f32.to_radians());
        let inner = fast_cos(40f32.to_radians());
        assert!(inner > outer);
    }
}

//! Atmospheric light estimation.

use crate::error::{Error, Result};
use crate::map::{ColorMap, ScalarMap};

/// Smallest atmospheric light component used as a divisor.
///
/// An all-black candidate set would otherwise make the normalization in
/// transmission estimation divide by zero.
pub const ATMOSPHERE_FLOOR: f32 = 1e-3;

/// Estimated haze color, one normalized component per channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericLight(pub [f32; 3]);

impl AtmosphericLight {
    /// Components as an array.
    #[must_use]
    pub fn components(self) -> [f32; 3] {
        self.0
    }

    /// Components raised to at least `floor`, for use as divisors.
    #[must_use]
    pub fn floored(self, floor: f32) -> [f32; 3] {
        self.0.map(|c| c.max(floor))
    }

    /// First channel whose component is below `floor`, with its value.
    #[must_use]
    pub fn degenerate_channel(self, floor: f32) -> Option<(usize, f32)> {
        self.0.iter().copied().enumerate().find(|&(_, c)| c < floor)
    }
}

/// Estimate the atmospheric light from the haziest pixels.
///
/// Pixels are ranked by `dark` value, descending; ties keep raster order so the
/// result is deterministic. The top `ceil(N * top_fraction)` pixels (at least
/// one) form the candidate set and each channel takes its maximum over that set
/// independently.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if `dark` does not match `image`.
pub fn estimate_atmospheric_light(
    image: &ColorMap,
    dark: &ScalarMap,
    top_fraction: f64,
) -> Result<AtmosphericLight> {
    if dark.dimensions() != image.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: image.dimensions(),
            actual: dark.dimensions(),
        });
    }
    let values = dark.as_slice();
    let count = candidate_count(dark.pixel_count(), top_fraction);

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let pixels = image.pixels();
    let mut light = [0.0_f32; 3];
    for &idx in &order[..count] {
        for (l, &c) in light.iter_mut().zip(&pixels[idx]) {
            *l = l.max(c);
        }
    }
    Ok(AtmosphericLight(light))
}

/// Absolute slack absorbed before rounding up, so `1000 * 0.001` stays 1.
const COUNT_TOLERANCE: f64 = 1e-9;

/// Number of candidate pixels: `ceil(total * fraction)`, clamped to `[1, total]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn candidate_count(total: usize, fraction: f64) -> usize {
    let count = (total as f64 * fraction - COUNT_TOLERANCE).ceil() as usize;
    count.clamp(1, total.max(1))
}

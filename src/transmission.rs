//! Raw transmission estimation.
//!
//! Under the scattering model `I = J t + A (1 - t)`, dividing by `A` and
//! taking the dark channel leaves roughly `1 - t` wherever the scene obeys
//! the dark channel prior.

use crate::atmosphere::{AtmosphericLight, ATMOSPHERE_FLOOR};
use crate::dark_channel::dark_channel;
use crate::map::{ColorMap, ScalarMap};

/// Estimate the raw transmission map `1 - omega * dark(I / A)`.
///
/// Atmospheric light components are floored at [`ATMOSPHERE_FLOOR`] before
/// dividing. The result is unbounded; pass it through [`clip_transmission`]
/// before refinement.
#[must_use]
pub fn estimate_transmission(
    image: &ColorMap,
    atmosphere: AtmosphericLight,
    patch_size: u32,
    omega: f32,
) -> ScalarMap {
    let divisor = atmosphere.floored(ATMOSPHERE_FLOOR);
    let normalized: Vec<[f32; 3]> = image
        .pixels()
        .iter()
        .map(|px| [px[0] / divisor[0], px[1] / divisor[1], px[2] / divisor[2]])
        .collect();
    let normalized = ColorMap::from_parts(image.width(), image.height(), normalized);

    dark_channel(&normalized, patch_size).map(|d| 1.0 - omega * d)
}

/// Clamp transmission values to `[floor, 1]`.
#[must_use]
pub fn clip_transmission(transmission: &ScalarMap, floor: f32) -> ScalarMap {
    transmission.map(|t| t.clamp(floor, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haze_free_dark_scene_has_full_transmission() {
        let image = ColorMap::new(10, 10, vec![[0.6, 0.0, 0.3]; 100]).unwrap();
        let t = estimate_transmission(&image, AtmosphericLight([0.9; 3]), 5, 0.95);
        for &v in t.as_slice() {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn pure_atmosphere_has_minimal_transmission() {
        let a = [0.8, 0.7, 0.9];
        let image = ColorMap::new(6, 6, vec![a; 36]).unwrap();
        let t = estimate_transmission(&image, AtmosphericLight(a), 3, 0.95);
        for &v in t.as_slice() {
            assert!((v - 0.05).abs() < 1e-5, "got {v}");
        }
    }

    #[test]
    fn known_haze_level_is_recovered() {
        // J has a zero channel, so dark(I / A) = 1 - t exactly.
        let a = 0.8_f32;
        let t_true = 0.6_f32;
        let j = [0.5_f32, 0.0, 0.9];
        let px = j.map(|c| c * t_true + a * (1.0 - t_true));
        let image = ColorMap::new(8, 8, vec![px; 64]).unwrap();

        let t = estimate_transmission(&image, AtmosphericLight([a; 3]), 3, 1.0);
        for &v in t.as_slice() {
            assert!((v - t_true).abs() < 1e-5, "got {v}");
        }
    }

    #[test]
    fn zero_atmosphere_stays_finite() {
        let image = ColorMap::new(4, 4, vec![[0.0; 3]; 16]).unwrap();
        let t = estimate_transmission(&image, AtmosphericLight([0.0; 3]), 3, 0.95);
        assert!(t.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn clipping_bounds_values() {
        let raw = ScalarMap::new(4, 1, vec![-0.3, 0.05, 0.5, 1.2]).unwrap();
        let clipped = clip_transmission(&raw, 0.1);
        assert_eq!(clipped.as_slice(), &[0.1, 0.1, 0.5, 1.0]);
    }
}

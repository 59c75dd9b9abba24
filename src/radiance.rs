//! Scene radiance recovery.

use crate::atmosphere::AtmosphericLight;
use crate::error::{Error, Result};
use crate::map::{ColorMap, ScalarMap};

/// Invert the scattering model: `J = (I - A) / max(t, floor) + A`.
///
/// The result is left unclipped; [`ColorMap::to_rgb8`] clips when scaling
/// back to 8 bits.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if `transmission` does not match `image`.
pub fn recover_radiance(
    image: &ColorMap,
    atmosphere: AtmosphericLight,
    transmission: &ScalarMap,
    floor: f32,
) -> Result<ColorMap> {
    if transmission.dimensions() != image.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: image.dimensions(),
            actual: transmission.dimensions(),
        });
    }
    let a = atmosphere.components();
    let data = image
        .pixels()
        .iter()
        .zip(transmission.as_slice())
        .map(|(px, &t)| {
            let t = t.max(floor);
            [
                (px[0] - a[0]) / t + a[0],
                (px[1] - a[1]) / t + a[1],
                (px[2] - a[2]) / t + a[2],
            ]
        })
        .collect();
    Ok(ColorMap::from_parts(image.width(), image.height(), data))
}

//! Floating-point maps passed between pipeline stages.
//!
//! Every stage takes maps by reference and returns a freshly allocated map;
//! nothing is mutated in place.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::{Error, Result};

/// BT.601 luma weights applied to the R, G and B channels.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Checks that `data_len` matches a `width x height` grid with at least one pixel.
fn check_shape(width: u32, height: u32, data_len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput {
            reason: format!("image must be at least 1x1, got {width}x{height}"),
        });
    }
    let expected = width as usize * height as usize;
    if data_len != expected {
        return Err(Error::InvalidInput {
            reason: format!("buffer holds {data_len} pixels, {width}x{height} needs {expected}"),
        });
    }
    Ok(())
}

/// A single-channel floating-point map, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl ScalarMap {
    /// Create a map from row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the map is empty or `data` does not
    /// hold exactly `width * height` values.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        check_shape(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a map with every value set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Map width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels in the map.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Row-major values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the map.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Apply `f` to every value, producing a new map.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self::from_parts(self.width, self.height, self.data.iter().map(|&v| f(v)).collect())
    }

    /// Smallest value in the map.
    #[must_use]
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest value in the map.
    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Render the map as an 8-bit grayscale image, clipping to `[0, 1]`.
    #[must_use]
    pub fn to_luma8(&self) -> GrayImage {
        let width = self.width as usize;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let v = self.data[y as usize * width + x as usize];
            Luma([to_u8(v * 255.0)])
        })
    }
}

/// A 3-channel image with intensities normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    width: u32,
    height: u32,
    data: Vec<[f32; 3]>,
}

impl ColorMap {
    /// Create a color map from row-major pixels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the map is empty or `data` does not
    /// hold exactly `width * height` pixels.
    pub fn new(width: u32, height: u32, data: Vec<[f32; 3]>) -> Result<Self> {
        check_shape(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<[f32; 3]>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Normalize an 8-bit RGB image to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the image has zero width or height.
    pub fn from_rgb8(image: &RgbImage) -> Result<Self> {
        let data: Vec<[f32; 3]> = image
            .pixels()
            .map(|px| px.0.map(|c| f32::from(c) / 255.0))
            .collect();
        Self::new(image.width(), image.height(), data)
    }

    /// Scale back to 8 bits: multiply by 255, clip to `[0, 255]`, round.
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        let width = self.width as usize;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let px = self.data[y as usize * width + x as usize];
            Rgb(px.map(|c| to_u8(c * 255.0)))
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major pixels.
    #[must_use]
    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Per-pixel minimum across the three channels.
    #[must_use]
    pub fn min_channel(&self) -> ScalarMap {
        let data = self
            .data
            .iter()
            .map(|&[r, g, b]| r.min(g).min(b))
            .collect();
        ScalarMap::from_parts(self.width, self.height, data)
    }
}

/// Grayscale guide for the transmission refiner.
///
/// Uses `0.299 R + 0.587 G + 0.114 B`, rounded to the nearest 8-bit level
/// like an 8-bit color conversion would, then normalized to `[0, 1]`.
#[must_use]
pub fn luma(image: &RgbImage) -> ScalarMap {
    let data = image
        .pixels()
        .map(|px| {
            let y: f32 = px
                .0
                .iter()
                .zip(LUMA_WEIGHTS)
                .map(|(&c, w)| w * f32::from(c))
                .sum();
            f32::from(to_u8(y)) / 255.0
        })
        .collect();
    ScalarMap::from_parts(image.width(), image.height(), data)
}

/// Clip to `[0, 255]` and round to the nearest integer level.
fn to_u8(v: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        v.clamp(0.0, 255.0).round() as u8
    }
}

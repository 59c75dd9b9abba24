//! Dark channel extraction.
//!
//! The dark channel of an image is the per-pixel minimum across color
//! channels, eroded by a square window. In haze-free outdoor scenes some
//! channel is close to zero in almost every patch; haze lifts that minimum.

use crate::map::{ColorMap, ScalarMap};

/// Compute the dark channel of `image` over a `patch_size x patch_size` window.
///
/// Windows are clamped to the image, so border pixels only see the part of
/// the window that lies inside it.
#[must_use]
pub fn dark_channel(image: &ColorMap, patch_size: u32) -> ScalarMap {
    min_filter(&image.min_channel(), patch_size)
}

/// Grayscale erosion with a `size x size` square, clamped at the borders.
///
/// A square structuring element is separable, so this runs a horizontal
/// then a vertical 1-D minimum.
#[must_use]
pub fn min_filter(map: &ScalarMap, size: u32) -> ScalarMap {
    let (width, height) = (map.width() as usize, map.height() as usize);
    let half = (size / 2) as usize;
    let src = map.as_slice();

    let mut rows = vec![0.0_f32; src.len()];
    for (src_row, dst_row) in src.chunks_exact(width).zip(rows.chunks_exact_mut(width)) {
        for (x, out) in dst_row.iter_mut().enumerate() {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(width);
            *out = window_min(&src_row[x0..x1]);
        }
    }

    let mut out = vec![0.0_f32; src.len()];
    let mut column = vec![0.0_f32; height];
    for x in 0..width {
        for (y, v) in column.iter_mut().enumerate() {
            *v = rows[y * width + x];
        }
        for y in 0..height {
            let y0 = y.saturating_sub(half);
            let y1 = (y + half + 1).min(height);
            out[y * width + x] = window_min(&column[y0..y1]);
        }
    }

    ScalarMap::from_parts(map.width(), map.height(), out)
}

fn window_min(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(width: u32, height: u32, px: [f32; 3]) -> ColorMap {
        ColorMap::new(width, height, vec![px; (width * height) as usize]).unwrap()
    }

    #[test]
    fn uniform_image_has_constant_dark_channel() {
        let image = uniform(20, 12, [0.7, 0.35, 0.5]);
        let dark = dark_channel(&image, 15);
        assert_eq!(dark.dimensions(), (20, 12));
        for &v in dark.as_slice() {
            assert!((v - 0.35).abs() < 1e-6, "expected 0.35, got {v}");
        }
    }

    #[test]
    fn single_dark_pixel_spreads_over_window() {
        let mut pixels = vec![[0.8_f32; 3]; 31 * 31];
        pixels[15 * 31 + 15] = [0.8, 0.1, 0.8];
        let image = ColorMap::new(31, 31, pixels).unwrap();
        let dark = dark_channel(&image, 15);

        // Dark square covers [8, 22] on both axes.
        for y in 0..31 {
            for x in 0..31 {
                let inside = (8..=22).contains(&x) && (8..=22).contains(&y);
                let expected = if inside { 0.1 } else { 0.8 };
                let v = dark.get(x, y);
                assert!((v - expected).abs() < 1e-6, "({x},{y}) = {v}");
            }
        }
    }

    #[test]
    fn corner_pixel_uses_clamped_window() {
        let mut pixels = vec![[0.9_f32; 3]; 20 * 20];
        pixels[0] = [0.0, 0.0, 0.0];
        let image = ColorMap::new(20, 20, pixels).unwrap();
        let dark = dark_channel(&image, 5);

        assert!(dark.get(0, 0).abs() < 1e-6);
        assert!(dark.get(2, 2).abs() < 1e-6);
        assert!((dark.get(3, 0) - 0.9).abs() < 1e-6);
        assert!((dark.get(0, 3) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn patch_size_one_is_plain_channel_minimum() {
        let pixels = vec![
            [0.2, 0.4, 0.6],
            [0.9, 0.5, 0.7],
            [0.3, 0.3, 0.1],
            [1.0, 1.0, 1.0],
        ];
        let image = ColorMap::new(2, 2, pixels).unwrap();
        let dark = dark_channel(&image, 1);
        assert_eq!(dark.as_slice(), image.min_channel().as_slice());
    }

    #[test]
    fn window_larger_than_image_gives_global_minimum() {
        let pixels: Vec<[f32; 3]> = (0..9u8)
            .map(|i| {
                let v = 0.1 + f32::from(i) * 0.1;
                [v, v, v]
            })
            .collect();
        let image = ColorMap::new(3, 3, pixels).unwrap();
        let dark = dark_channel(&image, 15);
        for &v in dark.as_slice() {
            assert!((v - 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn dark_channel_is_never_negative_for_normalized_input() {
        let pixels: Vec<[f32; 3]> = (0..64u8)
            .map(|i| {
                let v = f32::from(i) / 63.0;
                [v, 1.0 - v, 0.5]
            })
            .collect();
        let image = ColorMap::new(8, 8, pixels).unwrap();
        assert!(dark_channel(&image, 3).min_value() >= 0.0);
    }
}

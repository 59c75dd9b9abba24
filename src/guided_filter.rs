//! Edge-aware transmission refinement.
//!
//! The raw transmission map is blocky because the dark channel is computed
//! over square patches. A guided filter fits `q = a * I + b` in every window
//! of the grayscale guide `I` and averages the coefficients, so the refined
//! map follows the guide's edges and is smooth elsewhere.
//!
//! Two backends implement [`TransmissionRefiner`]: [`BoxGuidedFilter`]
//! (sequential) and, with the `parallel` feature, [`ParallelGuidedFilter`].
//! Both run the same per-pixel arithmetic and give identical results.

use crate::config::RefinerKind;
use crate::error::{Error, Result};
use crate::map::ScalarMap;

/// Refines a transmission map using a grayscale guide.
pub trait TransmissionRefiner: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Filter `transmission` guided by `guide` with window radius `radius`
    /// and regularization `eps`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the maps differ in size.
    fn refine(
        &self,
        transmission: &ScalarMap,
        guide: &ScalarMap,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarMap>;
}

/// Sequential guided filter built on summed-area box means.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxGuidedFilter;

impl TransmissionRefiner for BoxGuidedFilter {
    fn name(&self) -> &'static str {
        "box"
    }

    fn refine(
        &self,
        transmission: &ScalarMap,
        guide: &ScalarMap,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarMap> {
        run_guided_filter(guide, transmission, radius, eps, Execution::Sequential)
    }
}

/// Guided filter that spreads rows across the rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelGuidedFilter;

#[cfg(feature = "parallel")]
impl TransmissionRefiner for ParallelGuidedFilter {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn refine(
        &self,
        transmission: &ScalarMap,
        guide: &ScalarMap,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarMap> {
        run_guided_filter(guide, transmission, radius, eps, Execution::Parallel)
    }
}

/// Build the refiner selected by `kind`.
#[must_use]
pub fn refiner_for(kind: RefinerKind) -> Box<dyn TransmissionRefiner> {
    match kind {
        RefinerKind::Box => Box::new(BoxGuidedFilter),
        #[cfg(feature = "parallel")]
        RefinerKind::Parallel => Box::new(ParallelGuidedFilter),
    }
}

/// Guided filter of `input` by `guide` using the sequential backend.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the maps differ in size.
pub fn guided_filter(
    guide: &ScalarMap,
    input: &ScalarMap,
    radius: u32,
    eps: f32,
) -> Result<ScalarMap> {
    run_guided_filter(guide, input, radius, eps, Execution::Sequential)
}

/// Mean over a `(2 * radius + 1)` square window clamped to the map.
///
/// Each output is divided by the number of pixels actually covered, so
/// borders are averaged over fewer samples rather than padded.
#[must_use]
pub fn box_mean(map: &ScalarMap, radius: u32) -> ScalarMap {
    let (width, height) = (map.width() as usize, map.height() as usize);
    let data = box_mean_raw(
        map.as_slice(),
        width,
        height,
        radius as usize,
        Execution::Sequential,
    );
    ScalarMap::from_parts(map.width(), map.height(), data)
}

#[derive(Debug, Clone, Copy)]
enum Execution {
    Sequential,
    #[cfg(feature = "parallel")]
    Parallel,
}

impl Execution {
    /// Call `f(y, row)` for every row of `out`.
    fn fill_rows<F>(self, out: &mut [f32], width: usize, f: F)
    where
        F: Fn(usize, &mut [f32]) + Send + Sync,
    {
        match self {
            Self::Sequential => out
                .chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| f(y, row)),
            #[cfg(feature = "parallel")]
            Self::Parallel => {
                use rayon::prelude::*;
                out.par_chunks_mut(width)
                    .enumerate()
                    .for_each(|(y, row)| f(y, row));
            }
        }
    }

    /// Build a `width x height` buffer from a per-index function.
    fn collect<F>(self, width: usize, height: usize, f: F) -> Vec<f32>
    where
        F: Fn(usize) -> f32 + Send + Sync,
    {
        let mut out = vec![0.0_f32; width * height];
        self.fill_rows(&mut out, width, |y, row| {
            let base = y * width;
            for (x, v) in row.iter_mut().enumerate() {
                *v = f(base + x);
            }
        });
        out
    }
}

/// Summed-area table with a zero top row and left column.
struct SummedArea {
    stride: usize,
    table: Vec<f64>,
}

impl SummedArea {
    fn new(values: &[f32], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0_f64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0_f64;
            for x in 0..width {
                row_sum += f64::from(values[y * width + x]);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }
        Self { stride, table }
    }

    /// Mean over columns `x0..x1` and rows `y0..y1`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn window_mean(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f32 {
        let s = self.stride;
        let sum = self.table[y1 * s + x1] - self.table[y0 * s + x1] - self.table[y1 * s + x0]
            + self.table[y0 * s + x0];
        (sum / ((x1 - x0) * (y1 - y0)) as f64) as f32
    }
}

fn box_mean_raw(
    values: &[f32],
    width: usize,
    height: usize,
    radius: usize,
    exec: Execution,
) -> Vec<f32> {
    let sat = SummedArea::new(values, width, height);
    let mut out = vec![0.0_f32; values.len()];
    exec.fill_rows(&mut out, width, |y, row| {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        for (x, v) in row.iter_mut().enumerate() {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            *v = sat.window_mean(x0, y0, x1, y1);
        }
    });
    out
}

fn run_guided_filter(
    guide: &ScalarMap,
    input: &ScalarMap,
    radius: u32,
    eps: f32,
    exec: Execution,
) -> Result<ScalarMap> {
    if guide.dimensions() != input.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: guide.dimensions(),
            actual: input.dimensions(),
        });
    }
    let (width, height) = (guide.width() as usize, guide.height() as usize);
    let radius = radius as usize;
    let mean = |values: &[f32]| box_mean_raw(values, width, height, radius, exec);
    let i = guide.as_slice();
    let p = input.as_slice();

    let mean_i = mean(i);
    let mean_p = mean(p);
    let ip = exec.collect(width, height, |k| i[k] * p[k]);
    let ii = exec.collect(width, height, |k| i[k] * i[k]);
    let mean_ip = mean(ip.as_slice());
    let mean_ii = mean(ii.as_slice());

    let a = exec.collect(width, height, |k| {
        let cov_ip = mean_ip[k] - mean_i[k] * mean_p[k];
        let var_i = mean_ii[k] - mean_i[k] * mean_i[k];
        cov_ip / (var_i + eps)
    });
    let b = exec.collect(width, height, |k| mean_p[k] - a[k] * mean_i[k]);

    let mean_a = mean(a.as_slice());
    let mean_b = mean(b.as_slice());
    let q = exec.collect(width, height, |k| mean_a[k] * i[k] + mean_b[k]);

    Ok(ScalarMap::from_parts(guide.width(), guide.height(), q))
}

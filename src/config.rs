//! Algorithm parameters.

use crate::error::{Error, Result};

/// Side of the square dark-channel window.
pub const DEFAULT_PATCH_SIZE: u32 = 15;
/// Guided-filter radius; the window is `(2 * radius + 1)` pixels wide.
pub const DEFAULT_RADIUS: u32 = 60;
/// Guided-filter regularization.
pub const DEFAULT_EPS: f32 = 1e-3;
/// Fraction of haze removed; the rest is kept so distant objects still look distant.
pub const DEFAULT_OMEGA: f32 = 0.95;
/// Fraction of the haziest pixels used to estimate atmospheric light.
pub const DEFAULT_TOP_FRACTION: f64 = 0.001;
/// Lower bound on transmission before recovery.
pub const DEFAULT_TRANSMISSION_FLOOR: f32 = 0.1;

/// Which guided-filter backend refines the transmission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinerKind {
    /// Sequential box-filter guided filter.
    Box,
    /// Row-parallel guided filter on the rayon thread pool.
    #[cfg(feature = "parallel")]
    Parallel,
}

impl Default for RefinerKind {
    fn default() -> Self {
        #[cfg(feature = "parallel")]
        {
            Self::Parallel
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self::Box
        }
    }
}

/// Parameters of the dehazing pipeline.
///
/// All fields have the defaults from He et al.; call [`DehazeConfig::validate`]
/// (or build a [`Dehazer`](crate::Dehazer)) to check a customized config.
#[derive(Debug, Clone, PartialEq)]
pub struct DehazeConfig {
    /// Dark-channel window side, odd and positive.
    pub patch_size: u32,
    /// Guided-filter radius, positive.
    pub radius: u32,
    /// Guided-filter regularization, positive.
    pub eps: f32,
    /// Haze removal strength in `(0, 1]`.
    pub omega: f32,
    /// Fraction of pixels used for the atmospheric light, in `(0, 1]`.
    pub top_fraction: f64,
    /// Minimum transmission in `(0, 1]`.
    pub transmission_floor: f32,
    /// Fail with [`Error::DegenerateAtmosphere`] instead of flooring a
    /// near-zero atmospheric light component.
    pub strict_atmosphere: bool,
    /// Transmission refiner backend.
    pub refiner: RefinerKind,
}

impl Default for DehazeConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            radius: DEFAULT_RADIUS,
            eps: DEFAULT_EPS,
            omega: DEFAULT_OMEGA,
            top_fraction: DEFAULT_TOP_FRACTION,
            transmission_floor: DEFAULT_TRANSMISSION_FLOOR,
            strict_atmosphere: false,
            refiner: RefinerKind::default(),
        }
    }
}

impl DehazeConfig {
    /// Check every parameter against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 || self.patch_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "patch_size must be odd and positive, got {}",
                self.patch_size
            )));
        }
        if self.radius == 0 {
            return Err(Error::InvalidConfig("radius must be positive".to_string()));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "eps must be positive, got {}",
                self.eps
            )));
        }
        check_unit_interval("omega", f64::from(self.omega))?;
        check_unit_interval("top_fraction", self.top_fraction)?;
        check_unit_interval("transmission_floor", f64::from(self.transmission_floor))?;
        Ok(())
    }
}

/// Accepts values in `(0, 1]`.
fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

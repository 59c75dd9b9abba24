//! Single-image haze removal with the Dark Channel Prior.
//!
//! Haze follows the scattering model `I = J * t + A * (1 - t)`: the observed
//! color `I` is the scene radiance `J` attenuated by the transmission `t` plus
//! the atmospheric light `A`. This crate estimates `A` and `t` from the image
//! alone and inverts the model:
//!
//! 1. [`dark_channel`](dark_channel::dark_channel): channel minimum, eroded
//!    over a square patch.
//! 2. [`estimate_atmospheric_light`](atmosphere::estimate_atmospheric_light):
//!    per-channel maximum over the haziest 0.1% of pixels.
//! 3. [`estimate_transmission`](transmission::estimate_transmission):
//!    `1 - omega * dark(I / A)`.
//! 4. [`TransmissionRefiner`]: guided filter on the image luma.
//! 5. [`recover_radiance`](radiance::recover_radiance):
//!    `J = (I - A) / max(t, 0.1) + A`.
//!
//! # Quick Start
//!
//! ```no_run
//! use dcp_dehaze::Dehazer;
//!
//! let dehazer = Dehazer::with_defaults();
//! let img = image::open("foggy.jpg").unwrap().to_rgb8();
//! let clear = dehazer.dehaze(&img).expect("dehaze failed");
//! clear.save("clear.jpg").unwrap();
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use dcp_dehaze::{DehazeConfig, Dehazer, RefinerKind};
//!
//! let config = DehazeConfig {
//!     omega: 0.85,
//!     radius: 30,
//!     refiner: RefinerKind::Box,
//!     ..DehazeConfig::default()
//! };
//! let dehazer = Dehazer::new(config).expect("invalid config");
//! let img = image::open("foggy.jpg").unwrap().to_rgb8();
//! let estimate = dehazer.analyze(&img).unwrap();
//! println!("atmospheric light: {:?}", estimate.atmosphere);
//! ```

#![deny(missing_docs)]

pub mod atmosphere;
pub mod config;
pub mod dark_channel;
mod engine;
pub mod error;
pub mod guided_filter;
pub mod map;
pub mod radiance;
pub mod transmission;

pub use atmosphere::{AtmosphericLight, ATMOSPHERE_FLOOR};
pub use config::{DehazeConfig, RefinerKind};
pub use engine::{
    default_output_path, is_supported_image, save_image, Dehazer, HazeEstimate, ProcessOptions,
    ProcessResult,
};
pub use error::{Error, Result};
pub use guided_filter::{BoxGuidedFilter, TransmissionRefiner};
#[cfg(feature = "parallel")]
pub use guided_filter::ParallelGuidedFilter;
pub use map::{ColorMap, ScalarMap};

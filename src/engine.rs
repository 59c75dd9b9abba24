//! Dehazing pipeline and file front-end.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::atmosphere::{estimate_atmospheric_light, AtmosphericLight, ATMOSPHERE_FLOOR};
use crate::config::DehazeConfig;
use crate::dark_channel::dark_channel;
use crate::error::{Error, Result};
use crate::guided_filter::{refiner_for, TransmissionRefiner};
use crate::map::{luma, ColorMap, ScalarMap};
use crate::radiance::recover_radiance;
use crate::transmission::{clip_transmission, estimate_transmission};

/// Options controlling file processing.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Also write each refined transmission map as a grayscale PNG here.
    pub transmission_dir: Option<PathBuf>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Path the dehazed image was written to, on success.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Estimated atmospheric light, if the pipeline ran.
    pub atmosphere: Option<AtmosphericLight>,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            atmosphere: None,
            message,
        }
    }
}

/// Intermediate products of one pipeline run.
#[derive(Debug, Clone)]
pub struct HazeEstimate {
    /// Dark channel of the input.
    pub dark_channel: ScalarMap,
    /// Estimated atmospheric light.
    pub atmosphere: AtmosphericLight,
    /// Transmission before clipping and refinement.
    pub raw_transmission: ScalarMap,
    /// Refined transmission, floored at the configured minimum.
    pub transmission: ScalarMap,
}

/// The dehazing pipeline.
///
/// Holds only a validated [`DehazeConfig`] and the transmission refiner, so
/// one instance can be shared across threads and reused for many images.
pub struct Dehazer {
    config: DehazeConfig,
    refiner: Box<dyn TransmissionRefiner>,
}

impl Dehazer {
    /// Create a dehazer, using the refiner backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any parameter is out of range.
    pub fn new(config: DehazeConfig) -> Result<Self> {
        let refiner = refiner_for(config.refiner);
        Self::with_refiner(config, refiner)
    }

    /// Create a dehazer with a custom transmission refiner.
    ///
    /// `config.refiner` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any parameter is out of range.
    pub fn with_refiner(
        config: DehazeConfig,
        refiner: Box<dyn TransmissionRefiner>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, refiner })
    }

    /// Create a dehazer with the default parameters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let config = DehazeConfig::default();
        Self {
            refiner: refiner_for(config.refiner),
            config,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &DehazeConfig {
        &self.config
    }

    /// Name of the transmission refiner backend.
    #[must_use]
    pub fn refiner_name(&self) -> &'static str {
        self.refiner.name()
    }

    /// Run the estimation stages without recovering the image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty image and
    /// [`Error::DegenerateAtmosphere`] in strict mode.
    pub fn analyze(&self, image: &RgbImage) -> Result<HazeEstimate> {
        let normalized = ColorMap::from_rgb8(image)?;
        self.estimate(image, &normalized)
    }

    /// Remove haze from `image`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty image and
    /// [`Error::DegenerateAtmosphere`] in strict mode.
    pub fn dehaze(&self, image: &RgbImage) -> Result<RgbImage> {
        self.dehaze_with_estimate(image).map(|(out, _)| out)
    }

    /// Remove haze from `image`, also returning the intermediate maps.
    ///
    /// # Errors
    ///
    /// Same as [`Dehazer::dehaze`].
    pub fn dehaze_with_estimate(&self, image: &RgbImage) -> Result<(RgbImage, HazeEstimate)> {
        let normalized = ColorMap::from_rgb8(image)?;
        let estimate = self.estimate(image, &normalized)?;
        let recovered = recover_radiance(
            &normalized,
            estimate.atmosphere,
            &estimate.transmission,
            self.config.transmission_floor,
        )?;
        Ok((recovered.to_rgb8(), estimate))
    }

    /// Remove haze from a decoded image of any 3-channel color type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the image does not have exactly
    /// three channels (grayscale, alpha) or is empty.
    pub fn dehaze_dynamic(&self, image: &DynamicImage) -> Result<RgbImage> {
        self.dehaze_dynamic_with_estimate(image).map(|(out, _)| out)
    }

    /// Like [`Dehazer::dehaze_dynamic`], also returning the intermediate maps.
    ///
    /// # Errors
    ///
    /// Same as [`Dehazer::dehaze_dynamic`].
    pub fn dehaze_dynamic_with_estimate(
        &self,
        image: &DynamicImage,
    ) -> Result<(RgbImage, HazeEstimate)> {
        let channels = image.color().channel_count();
        if channels != 3 {
            return Err(Error::InvalidInput {
                reason: format!("expected 3 color channels, got {channels}"),
            });
        }
        match image {
            DynamicImage::ImageRgb8(rgb) => self.dehaze_with_estimate(rgb),
            other => self.dehaze_with_estimate(&other.to_rgb8()),
        }
    }

    fn estimate(&self, image: &RgbImage, normalized: &ColorMap) -> Result<HazeEstimate> {
        let cfg = &self.config;

        let dark = dark_channel(normalized, cfg.patch_size);
        let atmosphere = estimate_atmospheric_light(normalized, &dark, cfg.top_fraction)?;
        if cfg.strict_atmosphere {
            if let Some((channel, value)) = atmosphere.degenerate_channel(ATMOSPHERE_FLOOR) {
                return Err(Error::DegenerateAtmosphere { channel, value });
            }
        }

        let raw_transmission =
            estimate_transmission(normalized, atmosphere, cfg.patch_size, cfg.omega);
        let clipped = clip_transmission(&raw_transmission, cfg.transmission_floor);
        let guide = luma(image);
        let floor = cfg.transmission_floor;
        let transmission = self
            .refiner
            .refine(&clipped, &guide, cfg.radius, cfg.eps)?
            .map(|t| t.max(floor));

        Ok(HazeEstimate {
            dark_channel: dark,
            atmosphere,
            raw_transmission,
            transmission,
        })
    }

    /// Process a single image file: load, dehaze, save.
    ///
    /// Never panics on bad input; failures are reported in the returned
    /// [`ProcessResult`].
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let start = Instant::now();

        let dyn_img = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("{}: failed to decode: {e}", input.display());
                return ProcessResult::failed(input, format!("Invalid image file: {e}"));
            }
        };

        let (dehazed, estimate) = match self.dehaze_dynamic_with_estimate(&dyn_img) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("{}: {e}", input.display());
                return ProcessResult::failed(input, format!("Processing error: {e}"));
            }
        };

        log::debug!(
            "{}: atmosphere {:?}, transmission [{:.3}, {:.3}], refiner {}, {:?}",
            input.display(),
            estimate.atmosphere.components(),
            estimate.transmission.min_value(),
            estimate.transmission.max_value(),
            self.refiner_name(),
            start.elapsed(),
        );

        if let Err(e) = ensure_parent_dir(output) {
            return ProcessResult::failed(
                input,
                format!("Failed to create output directory: {e}"),
            );
        }
        if let Err(e) = save_image(&dehazed, output) {
            log::warn!("{}: failed to save: {e}", output.display());
            return ProcessResult::failed(input, format!("Failed to save: {e}"));
        }

        let mut message = "Haze removed".to_string();
        if let Some(dir) = &opts.transmission_dir {
            let path = transmission_output_path(dir, input);
            let saved = ensure_parent_dir(&path)
                .map_err(Error::from)
                .and_then(|()| {
                    estimate
                        .transmission
                        .to_luma8()
                        .save(&path)
                        .map_err(Error::from)
                });
            match saved {
                Ok(()) => message = format!("Haze removed, transmission map in {}", path.display()),
                Err(e) => {
                    return ProcessResult {
                        path: input.to_path_buf(),
                        output: Some(output.to_path_buf()),
                        success: false,
                        atmosphere: Some(estimate.atmosphere),
                        message: format!("Failed to save transmission map: {e}"),
                    };
                }
            }
        }

        ProcessResult {
            path: input.to_path_buf(),
            output: Some(output.to_path_buf()),
            success: true,
            atmosphere: Some(estimate.atmosphere),
            message,
        }
    }

    /// Process all supported images in a directory.
    ///
    /// Each image is written to `output_dir` under its original file name.
    /// Uses parallel iteration when the `parallel` feature is enabled.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<_> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .filter(|e| is_supported_image(e.path().as_path()))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            return vec![ProcessResult::failed(
                output_dir,
                format!("Failed to create output directory: {e}"),
            )];
        }

        log::info!(
            "processing {} image(s) from {}",
            entries.len(),
            input_dir.display()
        );

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|entry| {
                    let output_path = output_dir.join(entry.file_name());
                    self.process_file(&entry.path(), &output_path, opts)
                })
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries
                .iter()
                .map(|entry| {
                    let output_path = output_dir.join(entry.file_name());
                    self.process_file(&entry.path(), &output_path, opts)
                })
                .collect()
        }
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

fn transmission_output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    dir.join(format!("{stem}_transmission.png"))
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "webp" | "tif" | "tiff"
        ),
        None => false,
    }
}

/// Save an RGB image with format-specific settings.
///
/// JPEG is written at quality 95; other formats use the encoder defaults.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::io::BufWriter::new(std::fs::File::create(path)?);
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 95);
            encoder.encode_image(img)?;
        }
        ImageFormat::Png | ImageFormat::Bmp | ImageFormat::WebP | ImageFormat::Tiff => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"dehazed_photo.jpg"` in the same directory.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("dehazed_{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefinerKind;
    use crate::guided_filter::BoxGuidedFilter;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let (r, g) = ((x * 255 / width) as u8, (y * 255 / height) as u8);
            Rgb([r, g, 180])
        })
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = DehazeConfig {
            patch_size: 4,
            ..DehazeConfig::default()
        };
        assert!(matches!(Dehazer::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn box_refiner_can_be_selected() {
        let config = DehazeConfig {
            refiner: RefinerKind::Box,
            ..DehazeConfig::default()
        };
        let dehazer = Dehazer::new(config).unwrap();
        assert_eq!(dehazer.refiner_name(), "box");
    }

    #[test]
    fn custom_refiner_is_used() {
        let dehazer =
            Dehazer::with_refiner(DehazeConfig::default(), Box::new(BoxGuidedFilter)).unwrap();
        assert_eq!(dehazer.refiner_name(), "box");
    }

    #[test]
    fn analyze_floors_refined_transmission() {
        let dehazer = Dehazer::with_defaults();
        let estimate = dehazer.analyze(&gradient(40, 30)).unwrap();
        assert_eq!(estimate.transmission.dimensions(), (40, 30));
        assert!(estimate.transmission.min_value() >= 0.1);
        assert_eq!(estimate.dark_channel.dimensions(), (40, 30));
    }

    #[test]
    fn strict_mode_rejects_black_image() {
        let config = DehazeConfig {
            strict_atmosphere: true,
            ..DehazeConfig::default()
        };
        let dehazer = Dehazer::new(config).unwrap();
        let err = dehazer.dehaze(&RgbImage::new(8, 8)).unwrap_err();
        assert!(matches!(err, Error::DegenerateAtmosphere { channel: 0, .. }));
    }

    #[test]
    fn dehaze_dynamic_rejects_non_color_images() {
        let dehazer = Dehazer::with_defaults();
        let gray = DynamicImage::new_luma8(4, 4);
        let rgba = DynamicImage::new_rgba8(4, 4);
        for img in [gray, rgba] {
            let err = dehazer.dehaze_dynamic(&img).unwrap_err();
            assert!(matches!(err, Error::InvalidInput { .. }));
        }
    }

    #[test]
    fn dynamic_estimate_matches_rgb8_path() {
        let dehazer = Dehazer::with_defaults();
        let img = gradient(24, 18);
        let (out, estimate) = dehazer
            .dehaze_dynamic_with_estimate(&DynamicImage::ImageRgb8(img.clone()))
            .unwrap();
        let (expected, expected_estimate) = dehazer.dehaze_with_estimate(&img).unwrap();
        assert_eq!(out, expected);
        assert_eq!(estimate.atmosphere, expected_estimate.atmosphere);
        assert_eq!(estimate.transmission, expected_estimate.transmission);
    }

    #[test]
    fn dehaze_dynamic_accepts_rgb16() {
        let dehazer = Dehazer::with_defaults();
        let img = DynamicImage::ImageRgb8(gradient(16, 16)).to_rgb16();
        let out = dehazer
            .dehaze_dynamic(&DynamicImage::ImageRgb16(img))
            .unwrap();
        assert_eq!(out.dimensions(), (16, 16));
    }

    #[test]
    fn empty_image_is_rejected() {
        let dehazer = Dehazer::with_defaults();
        let err = dehazer.dehaze(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn default_output_path_prepends_dehazed() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/dehazed_photo.jpg"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "dehazed_image.png"
        );
    }

    #[test]
    fn transmission_path_uses_stem() {
        let p = transmission_output_path(Path::new("/out"), Path::new("/in/foggy.jpeg"));
        assert_eq!(p, PathBuf::from("/out/foggy_transmission.png"));
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(is_supported_image(Path::new("photo.tiff")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn save_image_rejects_unknown_extension() {
        let img = RgbImage::new(2, 2);
        let err = save_image(&img, Path::new("out.unknownext")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}

//! Error types for the dcp-dehaze crate.

/// Errors that can occur while dehazing an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a non-empty 3-channel color image.
    #[error("invalid input image: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// A configuration value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two maps that must share a shape do not.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Expected `(width, height)`.
        expected: (u32, u32),
        /// Actual `(width, height)`.
        actual: (u32, u32),
    },

    /// An atmospheric light component is too close to zero to normalize by.
    ///
    /// Only returned when `strict_atmosphere` is set in
    /// [`DehazeConfig`](crate::DehazeConfig); otherwise the component is floored.
    #[error("degenerate atmospheric light: channel {channel} is {value}")]
    DegenerateAtmosphere {
        /// Channel index (0 = R, 1 = G, 2 = B).
        channel: usize,
        /// The offending component value.
        value: f32,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while decoding or encoding an image file.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

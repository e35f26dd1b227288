//! Error types for hashmatch.

use thiserror::Error;

/// Result alias for hashmatch operations.
pub type HashMatchResult<T> = std::result::Result<T, HashMatchError>;

/// Errors that can occur while training or running the detector.
///
/// Configuration errors are reported before any stage runs. Data-quality
/// errors reject a template or scene as a whole; empty outcomes (no windows,
/// no candidates, no matches) are not errors.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HashMatchError {
    /// A configuration value is out of its valid range.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// Training was requested without any template.
    #[error("template set is empty")]
    EmptyTemplateSet,
    /// A stage was used before its training pass completed.
    #[error("{stage} has not been trained")]
    NotTrained { stage: &'static str },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not fit inside the image.
    #[error("roi {x},{y} {width}x{height} outside image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Channels that must share one geometry do not.
    #[error("{context}: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        context: &'static str,
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    /// A template has fewer qualifying points than the configured count.
    #[error("template {template}: {found} {kind} points found, {required} required")]
    InsufficientFeaturePoints {
        template: usize,
        kind: &'static str,
        found: usize,
        required: usize,
    },
    /// A template cannot contribute to training.
    #[error("template {template} is degenerate: {reason}")]
    DegenerateTemplate {
        template: usize,
        reason: &'static str,
    },
    /// No triplet of any template produced a hash key.
    #[error("hash index is empty: no template produced a valid triplet")]
    EmptyHashIndex,
    /// The scene cannot be processed.
    #[error("degenerate scene: {reason}")]
    DegenerateScene { reason: &'static str },
    /// Image decoding failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}

impl HashMatchError {
    pub(crate) fn config(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidConfig { field, reason }
    }
}

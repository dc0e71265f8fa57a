//! Contains the crate-wide error type.

use thiserror::Error;

/// The error type returned by the quantization and consolidation functions.
///
/// All failures are synchronous return values and no partial output is ever produced.
/// See [`MosaicError::is_invalid_input`] for the variants caused by malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MosaicError {
    /// The width or height was zero.
    #[error("invalid input: image dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions {
        /// The provided width.
        width: u32,
        /// The provided height.
        height: u32,
    },
    /// The pixel buffer is shorter than `4 * width * height` bytes.
    #[error("invalid buffer size: expected at least {expected} bytes, got {actual}")]
    InvalidBufferSize {
        /// The minimum number of bytes needed.
        expected: usize,
        /// The length of the provided buffer.
        actual: usize,
    },
    /// The label map length is not equal to `width * height`.
    #[error("dimension mismatch: expected {expected} labels, got {actual}")]
    DimensionMismatch {
        /// The number of labels implied by the dimensions.
        expected: usize,
        /// The length of the provided label map.
        actual: usize,
    },
    /// The image has more pixels than [`MAX_PIXELS`](crate::MAX_PIXELS).
    #[error("invalid input: above the maximum of {max} pixels")]
    TooManyPixels {
        /// The maximum supported number of pixels.
        max: u32,
    },
    /// A label does not address an entry of the palette.
    #[error("invalid input: label {label} is outside of the palette (length {palette_len})")]
    LabelOutOfRange {
        /// The offending label.
        label: u32,
        /// The length of the palette.
        palette_len: usize,
    },
    /// The palette has no colors.
    #[error("invalid input: the palette is empty")]
    EmptyPalette,
    /// The hole pitch was not a finite number of at least one pixel.
    #[error("invalid input: hole pitch must be finite and at least one pixel, got {0}")]
    InvalidPitch(f64),
    /// The work was cancelled or superseded before it finished.
    #[error("the job was cancelled")]
    Cancelled,
    /// A background job panicked before producing a result.
    #[error("the job panicked")]
    JobPanicked,
}

impl MosaicError {
    /// Whether this error was caused by malformed input
    /// (as opposed to cancellation or a failed background job).
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::JobPanicked)
    }
}

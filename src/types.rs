//! Contains various types needed across the crate.

use crate::{MosaicError, MAX_LEVELS, MAX_PIXELS, MIN_LEVELS};
use palette::{cast::ComponentsAs, Srgb, Srgba};
use std::fmt::Display;
#[cfg(feature = "image")]
use image::RgbaImage;

/// A validated, borrowed RGBA8 pixel buffer together with its dimensions.
///
/// The buffer may be longer than `4 * width * height` bytes; any trailing bytes are ignored.
///
/// # Examples
/// ```
/// # use pegmosaic::{PixelGrid, MosaicError};
/// # fn main() -> Result<(), MosaicError> {
/// let rgba = vec![255; 2 * 2 * 4];
/// let grid = PixelGrid::new(&rgba, 2, 2)?;
/// assert_eq!(grid.num_pixels(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGrid<'a> {
    /// The pixels in row-major order, exactly `width * height` long.
    pixels: &'a [Srgba<u8>],
    /// The width of the image.
    width: u32,
    /// The height of the image.
    height: u32,
}

impl<'a> PixelGrid<'a> {
    /// Creates a new [`PixelGrid`] from a raw RGBA8 byte buffer.
    ///
    /// # Errors
    /// Returns [`MosaicError::ZeroDimensions`] if either dimension is zero,
    /// [`MosaicError::TooManyPixels`] if the image has more than [`MAX_PIXELS`] pixels,
    /// and [`MosaicError::InvalidBufferSize`] if `rgba` is shorter than `4 * width * height`.
    pub fn new(rgba: &'a [u8], width: u32, height: u32) -> Result<Self, MosaicError> {
        let len = checked_len(width, height)?;
        let expected = len * 4;
        if rgba.len() < expected {
            return Err(MosaicError::InvalidBufferSize { expected, actual: rgba.len() });
        }

        let pixels: &[Srgba<u8>] = rgba[..expected].components_as();
        Ok(Self { pixels, width, height })
    }

    /// Creates a new [`PixelGrid`] from a slice of already typed pixels.
    ///
    /// # Errors
    /// Same as [`PixelGrid::new`], where the buffer size check applies to the number of pixels.
    pub fn from_pixels(pixels: &'a [Srgba<u8>], width: u32, height: u32) -> Result<Self, MosaicError> {
        let len = checked_len(width, height)?;
        if pixels.len() < len {
            return Err(MosaicError::InvalidBufferSize {
                expected: len * 4,
                actual: pixels.len() * 4,
            });
        }

        Ok(Self { pixels: &pixels[..len], width, height })
    }

    /// Returns the pixels of the image in row-major order.
    #[must_use]
    pub const fn pixels(&self) -> &'a [Srgba<u8>] {
        self.pixels
    }

    /// Returns the width of the image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of pixels in the image.
    #[must_use]
    pub const fn num_pixels(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbaImage> for PixelGrid<'a> {
    type Error = MosaicError;

    fn try_from(image: &'a RgbaImage) -> Result<Self, Self::Error> {
        Self::new(image.as_raw(), image.width(), image.height())
    }
}

/// Validates the dimensions of an image and returns its number of pixels.
pub(crate) fn checked_len(width: u32, height: u32) -> Result<usize, MosaicError> {
    if width == 0 || height == 0 {
        return Err(MosaicError::ZeroDimensions { width, height });
    }

    let len = u64::from(width) * u64::from(height);
    if len > u64::from(MAX_PIXELS) {
        return Err(MosaicError::TooManyPixels { max: MAX_PIXELS });
    }

    #[allow(clippy::cast_possible_truncation)]
    let len = len as usize;
    Ok(len)
}

/// The number of quantization levels per color channel.
///
/// This is a simple new type wrapper around `u8` with the invariant that it must be
/// in the range `MIN_LEVELS..=MAX_LEVELS`.
/// The total number of bins (and so the palette length) is the cube of this value.
///
/// # Examples
/// ```
/// # use pegmosaic::{ChannelLevels, INTERACTIVE_MAX_LEVELS, MAX_LEVELS};
/// let levels = ChannelLevels::from_color_count(64, MAX_LEVELS);
/// assert_eq!(levels.get(), 4);
/// assert_eq!(levels.bins(), 64);
///
/// // clamped to the interactive limit
/// let levels = ChannelLevels::from_color_count(u16::MAX, INTERACTIVE_MAX_LEVELS);
/// assert_eq!(levels.get(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChannelLevels(u8);

impl ChannelLevels {
    /// The smallest supported number of levels per channel.
    pub const MIN: Self = Self(MIN_LEVELS);

    /// The largest supported number of levels per channel.
    pub const MAX: Self = Self(MAX_LEVELS);

    /// Creates a [`ChannelLevels`] by clamping the given value to `MIN_LEVELS..=MAX_LEVELS`.
    #[must_use]
    pub const fn from_clamped(levels: u8) -> Self {
        if levels < MIN_LEVELS {
            Self::MIN
        } else if levels > MAX_LEVELS {
            Self::MAX
        } else {
            Self(levels)
        }
    }

    /// Computes the levels per channel for a requested total color count `k`,
    /// that is `round(cbrt(k))` clamped to `MIN_LEVELS..=max_levels`.
    ///
    /// `max_levels` is itself clamped to `MIN_LEVELS..=MAX_LEVELS`.
    /// Degenerate color counts never fail; at least two levels are always used.
    #[must_use]
    pub fn from_color_count(k: u16, max_levels: u8) -> Self {
        let max = Self::from_clamped(max_levels).0;
        let levels = f64::from(k.max(2)).cbrt().round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let levels = levels.clamp(f64::from(MIN_LEVELS), f64::from(max)) as u8;
        Self(levels)
    }

    /// Gets the inner `u8` value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the total number of bins, that is `levels³`.
    #[must_use]
    pub const fn bins(self) -> usize {
        let l = self.0 as usize;
        l * l * l
    }
}

impl Default for ChannelLevels {
    fn default() -> Self {
        Self::from_color_count(crate::DEFAULT_COLOR_COUNT, MAX_LEVELS)
    }
}

impl From<ChannelLevels> for u8 {
    fn from(val: ChannelLevels) -> Self {
        val.get()
    }
}

impl Display for ChannelLevels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The output struct returned by the quantizer.
///
/// `palette` always has exactly [`ChannelLevels::bins`] entries in bin-index order,
/// and `labels` holds one bin index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeOutput {
    /// The number of levels per channel used to build the bins.
    pub levels: ChannelLevels,
    /// The mean color of each bin, or [`EMPTY_BIN_COLOR`](crate::EMPTY_BIN_COLOR) if the bin is empty.
    pub palette: Vec<Srgb<u8>>,
    /// The number of pixels that were assigned to each bin.
    pub counts: Vec<u32>,
    /// The bin index of each pixel in row-major order.
    pub labels: Vec<u32>,
}

impl QuantizeOutput {
    /// Returns the number of non-empty bins.
    #[must_use]
    pub fn used_bins(&self) -> usize {
        self.counts.iter().filter(|&&n| n > 0).count()
    }
}

/// Replaces each label with its palette color.
///
/// # Errors
/// Returns [`MosaicError::LabelOutOfRange`] if a label does not address a palette entry.
pub fn indexed_to_rgb(palette: &[Srgb<u8>], labels: &[u32]) -> Result<Vec<Srgb<u8>>, MosaicError> {
    labels
        .iter()
        .map(|&label| {
            palette
                .get(label as usize)
                .copied()
                .ok_or(MosaicError::LabelOutOfRange { label, palette_len: palette.len() })
        })
        .collect()
}

/// Creates an [`image::RgbImage`] preview from a palette and label map.
///
/// # Errors
/// Returns [`MosaicError::DimensionMismatch`] if `labels` does not have `width * height` entries
/// and [`MosaicError::LabelOutOfRange`] if a label does not address a palette entry.
#[cfg(feature = "image")]
pub fn to_rgbimage(
    palette: &[Srgb<u8>],
    labels: &[u32],
    width: u32,
    height: u32,
) -> Result<image::RgbImage, MosaicError> {
    use palette::cast::IntoComponents;

    let expected = checked_len(width, height)?;
    if labels.len() != expected {
        return Err(MosaicError::DimensionMismatch { expected, actual: labels.len() });
    }

    let buf: Vec<u8> = indexed_to_rgb(palette, labels)?.into_components();
    image::RgbImage::from_vec(width, height, buf)
        .ok_or(MosaicError::DimensionMismatch { expected, actual: labels.len() })
}

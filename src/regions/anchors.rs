//! Mounting hole (anchor) analysis.

use crate::{regions::Components, MosaicError};
use bitvec::vec::BitVec;

/// The fixed-pitch grid of anchor points over an image.
///
/// The points are `(pitch, pitch), (2·pitch, pitch), …` in pixel units, starting one pitch from
/// the top and left edges, rounded to the nearest pixel, and kept only while inside the bounds.
/// The pitch must be in the same pixel units as the label map, so callers working on a
/// downscaled copy must scale the pitch by the same factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorGrid {
    /// The spacing between anchor points in pixels.
    pitch: f64,
    /// The width of the image.
    width: u32,
    /// The height of the image.
    height: u32,
}

impl AnchorGrid {
    /// Creates a new [`AnchorGrid`].
    ///
    /// # Errors
    /// Returns [`MosaicError::InvalidPitch`] if `pitch` is not finite or is less than one pixel.
    pub fn new(pitch: f64, width: u32, height: u32) -> Result<Self, MosaicError> {
        if pitch.is_finite() && pitch >= 1.0 {
            Ok(Self { pitch, width, height })
        } else {
            Err(MosaicError::InvalidPitch(pitch))
        }
    }

    /// Returns the spacing between anchor points in pixels.
    #[must_use]
    pub const fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Returns the pixel coordinates along one axis of length `len`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn axis(pitch: f64, len: u32) -> impl Iterator<Item = u32> + Clone {
        let len = f64::from(len);
        (1u32..)
            .map(move |i| f64::from(i) * pitch)
            .take_while(move |&v| v < len)
            .map(f64::round)
            .filter(move |&v| v < len)
            .map(|v| v as u32)
    }

    /// Returns the `(x, y)` pixel coordinates of all anchor points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (u32, u32)> {
        let xs = Self::axis(self.pitch, self.width);
        Self::axis(self.pitch, self.height).flat_map(move |y| xs.clone().map(move |x| (x, y)))
    }

    /// Returns the number of anchor points.
    #[must_use]
    pub fn len(&self) -> usize {
        Self::axis(self.pitch, self.width).count() * Self::axis(self.pitch, self.height).count()
    }

    /// Whether the image is too small to contain any anchor point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks each component that contains at least one anchor point.
    ///
    /// The returned bit vector has one entry per component.
    ///
    /// # Errors
    /// Returns [`MosaicError::DimensionMismatch`] if `components` was not extracted from
    /// a label map of the same width and height as this grid.
    pub fn anchored(&self, components: &Components) -> Result<BitVec, MosaicError> {
        if (components.width(), components.height()) != (self.width, self.height) {
            return Err(MosaicError::DimensionMismatch {
                expected: self.width as usize * self.height as usize,
                actual: components.ids().len(),
            });
        }

        Ok(self.anchored_unchecked(components))
    }

    /// Marks anchored components without checking the dimensions.
    pub(crate) fn anchored_unchecked(&self, components: &Components) -> BitVec {
        let ids = components.ids();
        let w = self.width as usize;
        let mut anchored: BitVec = BitVec::repeat(false, components.len());
        for (x, y) in self.points() {
            let id = ids[y as usize * w + x as usize];
            anchored.set(id as usize, true);
        }
        anchored
    }
}

//! 4-connected component labeling of a label map.

use crate::{types::checked_len, MosaicError};

/// Marks pixels that have not been assigned to a component yet.
const UNVISITED: u32 = u32::MAX;

/// The maximal 4-connected runs of same-label pixels in a label map.
///
/// Components are numbered in scan (row-major) order of their first pixel.
/// Every pixel belongs to exactly one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    /// The component id of each pixel.
    ids: Vec<u32>,
    /// The label (bin) each component was grown from.
    bins: Vec<u32>,
    /// The number of pixels in each component.
    sizes: Vec<u32>,
    /// The width of the label map.
    width: u32,
    /// The height of the label map.
    height: u32,
}

/// Returns the in-bounds 4-neighbors of pixel `p` (right, left, down, up).
#[inline]
pub(crate) fn neighbors4(p: usize, width: usize, height: usize) -> impl Iterator<Item = usize> {
    let x = p % width;
    let y = p / width;
    [
        (x + 1 < width).then(|| p + 1),
        (x > 0).then(|| p - 1),
        (y + 1 < height).then(|| p + width),
        (y > 0).then(|| p - width),
    ]
    .into_iter()
    .flatten()
}

impl Components {
    /// Extracts the 4-connected components of `labels` with flood fill.
    ///
    /// A pixel only joins the current fill if its label equals the seed's label;
    /// there is no diagonal connectivity.
    ///
    /// # Errors
    /// Returns [`MosaicError::ZeroDimensions`] if either dimension is zero
    /// and [`MosaicError::DimensionMismatch`] if `labels.len() != width * height`.
    pub fn new(labels: &[u32], width: u32, height: u32) -> Result<Self, MosaicError> {
        let expected = checked_len(width, height)?;
        if labels.len() != expected {
            return Err(MosaicError::DimensionMismatch { expected, actual: labels.len() });
        }

        Ok(Self::new_unchecked(labels, width, height))
    }

    /// Extracts components without validating the dimensions.
    pub(crate) fn new_unchecked(labels: &[u32], width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);

        let mut ids = vec![UNVISITED; labels.len()];
        let mut bins = Vec::new();
        let mut sizes = Vec::new();
        let mut stack = Vec::new();

        for seed in 0..labels.len() {
            if ids[seed] != UNVISITED {
                continue;
            }

            #[allow(clippy::cast_possible_truncation)]
            let id = bins.len() as u32;
            let bin = labels[seed];

            ids[seed] = id;
            stack.push(seed);
            let mut size = 0u32;

            while let Some(p) = stack.pop() {
                size += 1;
                for q in neighbors4(p, w, h) {
                    if ids[q] == UNVISITED && labels[q] == bin {
                        ids[q] = id;
                        stack.push(q);
                    }
                }
            }

            bins.push(bin);
            sizes.push(size);
        }

        Self { ids, bins, sizes, width, height }
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether there are no components (never the case for a valid label map).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Returns the component id of each pixel.
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Returns the originating label of each component.
    #[must_use]
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Returns the pixel count of each component.
    #[must_use]
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Returns the originating label of the given component.
    #[must_use]
    pub fn bin(&self, id: u32) -> u32 {
        self.bins[id as usize]
    }

    /// Returns the pixel count of the given component.
    #[must_use]
    pub fn size(&self, id: u32) -> u32 {
        self.sizes[id as usize]
    }

    /// Returns the width of the label map.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the label map.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

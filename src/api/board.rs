//! Contains [`BoardGeometry`], the physical layout of a pegboard in millimeters and pixels.

use std::fmt::{self, Display};

/// The pixel dimensions of the working grid for a board of a given physical size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingSize {
    /// The width of the working grid in pixels.
    pub width: u32,
    /// The height of the working grid in pixels.
    pub height: u32,
    /// The density of the working grid in pixels per millimeter.
    ///
    /// This is lower than [`BoardGeometry::px_per_mm`] if the grid had to be downscaled.
    pub px_per_mm: f64,
}

impl WorkingSize {
    /// Whether the grid was downscaled to fit [`BoardGeometry::max_side_px`].
    #[must_use]
    pub fn is_downscaled(&self, geometry: &BoardGeometry) -> bool {
        self.px_per_mm < geometry.px_per_mm
    }
}

impl Display for WorkingSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} px ({:.3} px/mm)", self.width, self.height, self.px_per_mm)
    }
}

/// The physical layout of a pegboard and the pixel density used to map it onto an image.
///
/// Mounting holes sit on a square grid with a fixed pitch,
/// with the first hole center one pitch away from the top and left edges.
/// Boards are produced in whole rows, so physical sizes snap to multiples of the row height.
///
/// # Examples
/// ```
/// # use pegmosaic::BoardGeometry;
/// let board = BoardGeometry::new();
/// assert_eq!(board.pitch_px(), 16.0);
/// assert_eq!(board.min_area_px(1.0), 256);
///
/// let size = board.working_size(400.0, 300.0);
/// assert_eq!((size.width, size.height), (800, 600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoardGeometry {
    /// The distance between neighboring hole centers in millimeters.
    pub hole_pitch_mm: f64,
    /// The diameter of a hole in millimeters.
    pub hole_diameter_mm: f64,
    /// The height of a production row in millimeters.
    pub row_mm: f64,
    /// The density of the working grid in pixels per millimeter.
    pub px_per_mm: f64,
    /// The maximum number of pixels along either side of the working grid.
    pub max_side_px: u32,
}

impl BoardGeometry {
    /// The default distance between hole centers is `8` mm.
    pub const DEFAULT_HOLE_PITCH_MM: f64 = 8.0;

    /// The default hole diameter is `4` mm.
    pub const DEFAULT_HOLE_DIAMETER_MM: f64 = 4.0;

    /// The default row height is `16` mm.
    pub const DEFAULT_ROW_MM: f64 = 16.0;

    /// The default working grid density is `2` pixels per millimeter.
    pub const DEFAULT_PX_PER_MM: f64 = 2.0;

    /// The default maximum side length of the working grid is `16384` pixels.
    pub const DEFAULT_MAX_SIDE_PX: u32 = 16384;

    /// The smallest minimum region area in pixels that [`BoardGeometry::min_area_px`] returns.
    pub const MIN_AREA_FLOOR_PX: u32 = 4;

    /// Creates a new [`BoardGeometry`] with the default dimensions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hole_pitch_mm: Self::DEFAULT_HOLE_PITCH_MM,
            hole_diameter_mm: Self::DEFAULT_HOLE_DIAMETER_MM,
            row_mm: Self::DEFAULT_ROW_MM,
            px_per_mm: Self::DEFAULT_PX_PER_MM,
            max_side_px: Self::DEFAULT_MAX_SIDE_PX,
        }
    }

    /// Sets the density of the working grid in pixels per millimeter.
    #[must_use]
    pub fn px_per_mm(mut self, px_per_mm: f64) -> Self {
        self.px_per_mm = px_per_mm;
        self
    }

    /// Sets the maximum number of pixels along either side of the working grid.
    #[must_use]
    pub fn max_side_px(mut self, max_side_px: u32) -> Self {
        self.max_side_px = max_side_px;
        self
    }

    /// Returns the hole pitch in pixels of the working grid.
    #[must_use]
    pub fn pitch_px(&self) -> f64 {
        self.hole_pitch_mm * self.px_per_mm
    }

    /// Returns the hole radius in pixels of the working grid.
    #[must_use]
    pub fn hole_radius_px(&self) -> f64 {
        self.hole_diameter_mm / 2.0 * self.px_per_mm
    }

    /// Returns the minimum region area in pixels for a multiplier of one grid cell (`pitch²`).
    ///
    /// The result is never less than [`BoardGeometry::MIN_AREA_FLOOR_PX`].
    #[must_use]
    pub fn min_area_px(&self, multiplier: f64) -> u32 {
        let pitch = self.pitch_px();
        let area = (multiplier * pitch * pitch).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let area = area.clamp(0.0, f64::from(u32::MAX)) as u32;
        area.max(Self::MIN_AREA_FLOOR_PX)
    }

    /// Snaps a physical length in millimeters down to whole rows, but never below one row.
    #[must_use]
    pub fn snap_to_rows(&self, mm: f64) -> f64 {
        self.row_mm.max((mm / self.row_mm).floor() * self.row_mm)
    }

    /// Returns the working grid size for a board of the given physical size.
    ///
    /// Each side is at least one pixel. If either side exceeds [`BoardGeometry::max_side_px`],
    /// both are scaled down uniformly and the effective density is reported in the result.
    #[must_use]
    pub fn working_size(&self, width_mm: f64, height_mm: f64) -> WorkingSize {
        /// Converts a non-negative length to whole pixels, at least one.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn to_px(v: f64) -> u32 {
            v.clamp(1.0, f64::from(u32::MAX)) as u32
        }

        let width = to_px((width_mm * self.px_per_mm).round());
        let height = to_px((height_mm * self.px_per_mm).round());
        let max_side = width.max(height);

        if max_side > self.max_side_px {
            let k = f64::from(self.max_side_px) / f64::from(max_side);
            let size = WorkingSize {
                width: to_px((f64::from(width) * k).floor()),
                height: to_px((f64::from(height) * k).floor()),
                px_per_mm: self.px_per_mm * k,
            };
            tracing::debug!(%size, "working grid downscaled");
            size
        } else {
            WorkingSize { width, height, px_per_mm: self.px_per_mm }
        }
    }

    /// Returns this geometry at a different pixel density, for example
    /// the density reported by [`BoardGeometry::working_size`] for a downscaled grid.
    #[must_use]
    pub fn scaled(self, px_per_mm: f64) -> Self {
        self.px_per_mm(px_per_mm)
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self::new()
    }
}

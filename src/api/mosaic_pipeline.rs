//! Contains the [`MosaicPipeline`] builder struct for the high level API.

#[cfg(feature = "threads")]
use crate::uniform::indexed_palette_par;
use crate::{
    indexed_to_rgb,
    regions::{ConsolidateOptions, ConsolidateOutput, Consolidator},
    uniform::{indexed_palette, indexed_palette_cancellable},
    BoardGeometry, CancelToken, ChannelLevels, MosaicError, PixelGrid, QuantizeOutput,
    DEFAULT_COLOR_COUNT, DEFAULT_MAX_PASSES, INTERACTIVE_MAX_LEVELS, MAX_COLOR_COUNT, MAX_LEVELS,
    MIN_COLOR_COUNT,
};
use palette::Srgb;
use std::ops::RangeInclusive;
#[cfg(feature = "image")]
use {
    crate::to_rgbimage,
    image::{RgbImage, RgbaImage},
};

/// The operator facing options of a [`MosaicPipeline`].
///
/// Setters clamp their arguments to the supported ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MosaicOptions {
    /// The requested number of colors.
    color_count: u16,
    /// The maximum number of levels per channel.
    max_levels: u8,
    /// The minimum region area as a multiple of one grid cell (`pitch²`).
    min_area_multiplier: f64,
    /// The physical board layout.
    geometry: BoardGeometry,
    /// The maximum number of consolidation passes.
    max_passes: u32,
}

impl MosaicOptions {
    /// The supported range of minimum area multipliers.
    pub const MIN_AREA_MULTIPLIER_RANGE: RangeInclusive<f64> = 0.25..=10.0;

    /// The default minimum area multiplier is one full grid cell.
    pub const DEFAULT_MIN_AREA_MULTIPLIER: f64 = 1.0;

    /// Creates a new [`MosaicOptions`] with default values for batch processing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            color_count: DEFAULT_COLOR_COUNT,
            max_levels: MAX_LEVELS,
            min_area_multiplier: Self::DEFAULT_MIN_AREA_MULTIPLIER,
            geometry: BoardGeometry::new(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Sets the requested number of colors, clamped to `MIN_COLOR_COUNT..=MAX_COLOR_COUNT`.
    ///
    /// The default is [`DEFAULT_COLOR_COUNT`].
    #[must_use]
    pub fn color_count(mut self, k: u16) -> Self {
        self.color_count = k.clamp(MIN_COLOR_COUNT, MAX_COLOR_COUNT);
        self
    }

    /// Limits the number of levels per channel to [`INTERACTIVE_MAX_LEVELS`]
    /// instead of [`MAX_LEVELS`].
    ///
    /// Color counts are clamped to [`MAX_COLOR_COUNT`] (6 levels), so neither limit is reached
    /// through this API. The cap only changes the result of [`ChannelLevels::from_color_count`]
    /// for larger counts.
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.max_levels = if interactive { INTERACTIVE_MAX_LEVELS } else { MAX_LEVELS };
        self
    }

    /// Sets the minimum region area as a multiple of one grid cell,
    /// clamped to [`MosaicOptions::MIN_AREA_MULTIPLIER_RANGE`].
    ///
    /// The default is [`MosaicOptions::DEFAULT_MIN_AREA_MULTIPLIER`].
    #[must_use]
    pub fn min_area_multiplier(mut self, multiplier: f64) -> Self {
        let range = Self::MIN_AREA_MULTIPLIER_RANGE;
        self.min_area_multiplier = if multiplier.is_nan() {
            Self::DEFAULT_MIN_AREA_MULTIPLIER
        } else {
            multiplier.clamp(*range.start(), *range.end())
        };
        self
    }

    /// Sets the physical board layout.
    #[must_use]
    pub fn geometry(mut self, geometry: BoardGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Sets the maximum number of consolidation passes.
    ///
    /// The default is [`DEFAULT_MAX_PASSES`].
    #[must_use]
    pub fn max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Returns the number of levels per channel used for the current color count.
    #[must_use]
    pub fn levels(&self) -> ChannelLevels {
        ChannelLevels::from_color_count(self.color_count, self.max_levels)
    }

    /// Returns the minimum region area in pixels.
    #[must_use]
    pub fn min_area_px(&self) -> u32 {
        self.geometry.min_area_px(self.min_area_multiplier)
    }

    /// Returns the options for the consolidation step.
    #[must_use]
    pub fn consolidate_options(&self) -> ConsolidateOptions {
        ConsolidateOptions::new(self.min_area_px(), self.geometry.pitch_px())
            .max_passes(self.max_passes)
    }
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The quantized and consolidated result of a [`MosaicPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mosaic {
    /// The width of the mosaic in pixels.
    pub width: u32,
    /// The height of the mosaic in pixels.
    pub height: u32,
    /// The output of the quantization step, including the full bin palette.
    pub quantized: QuantizeOutput,
    /// The output of the consolidation step. Its labels index `quantized.palette`.
    pub consolidated: ConsolidateOutput,
}

impl Mosaic {
    /// Returns the palette the labels index into.
    #[must_use]
    pub fn palette(&self) -> &[Srgb<u8>] {
        &self.quantized.palette
    }

    /// Returns the consolidated label map.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.consolidated.labels
    }

    /// Returns the color of each pixel of the consolidated mosaic.
    #[must_use]
    pub fn to_rgb(&self) -> Vec<Srgb<u8>> {
        self.labels().iter().map(|&l| self.palette()[l as usize]).collect()
    }

    /// Renders the consolidated mosaic into an [`RgbImage`].
    ///
    /// # Errors
    /// Returns an error if the stored dimensions do not match the label map.
    #[cfg(feature = "image")]
    pub fn to_rgbimage(&self) -> Result<RgbImage, MosaicError> {
        to_rgbimage(self.palette(), self.labels(), self.width, self.height)
    }
}

/// A builder struct to quantize an image and consolidate its regions into a buildable mosaic.
///
/// # Examples
/// To start, create a [`MosaicPipeline`] from an [`RgbaImage`] (note that the `image` feature is needed):
/// ```no_run
/// # use pegmosaic::MosaicPipeline;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgba8();
/// let mut pipeline = MosaicPipeline::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
///
/// Then, change the options and run the pipeline:
/// ```
/// # use pegmosaic::{MosaicPipeline, MosaicError, PixelGrid};
/// # fn main() -> Result<(), MosaicError> {
/// # let rgba = vec![255; 64 * 48 * 4];
/// # let grid = PixelGrid::new(&rgba, 64, 48)?;
/// let mosaic = MosaicPipeline::new(grid)
///     .color_count(27)
///     .min_area_multiplier(0.5)
///     .run()?;
///
/// assert_eq!(mosaic.palette().len(), 27);
/// assert_eq!(mosaic.labels().len(), 64 * 48);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct MosaicPipeline<'a> {
    /// The input image.
    grid: PixelGrid<'a>,
    /// The options to run with.
    options: MosaicOptions,
}

impl<'a> MosaicPipeline<'a> {
    /// Creates a new [`MosaicPipeline`] with default options.
    pub fn new(grid: PixelGrid<'a>) -> Self {
        Self { grid, options: MosaicOptions::new() }
    }

    /// Replaces all options at once.
    pub fn options(&mut self, options: MosaicOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Sets the requested number of colors. See [`MosaicOptions::color_count`].
    pub fn color_count(&mut self, k: u16) -> &mut Self {
        self.options = self.options.color_count(k);
        self
    }

    /// Sets the interactive level cap. See [`MosaicOptions::interactive`].
    pub fn interactive(&mut self, interactive: bool) -> &mut Self {
        self.options = self.options.interactive(interactive);
        self
    }

    /// Sets the minimum region area multiplier. See [`MosaicOptions::min_area_multiplier`].
    pub fn min_area_multiplier(&mut self, multiplier: f64) -> &mut Self {
        self.options = self.options.min_area_multiplier(multiplier);
        self
    }

    /// Sets the physical board layout.
    ///
    /// The geometry's pixel density must match the input image.
    pub fn geometry(&mut self, geometry: BoardGeometry) -> &mut Self {
        self.options = self.options.geometry(geometry);
        self
    }

    /// Sets the maximum number of consolidation passes.
    pub fn max_passes(&mut self, max_passes: u32) -> &mut Self {
        self.options = self.options.max_passes(max_passes);
        self
    }

    /// Returns the current options.
    #[must_use]
    pub fn current_options(&self) -> MosaicOptions {
        self.options
    }

    /// Runs only the quantization step.
    #[must_use]
    pub fn quantize(&self) -> QuantizeOutput {
        indexed_palette(self.grid, self.options.levels())
    }

    /// Runs only the quantization step in parallel.
    #[cfg(feature = "threads")]
    #[must_use]
    pub fn quantize_par(&self) -> QuantizeOutput {
        indexed_palette_par(self.grid, self.options.levels())
    }

    /// Consolidates a quantization of this pipeline's image.
    fn consolidate(&self, quantized: QuantizeOutput) -> Result<Mosaic, MosaicError> {
        let (width, height) = (self.grid.width(), self.grid.height());
        let consolidated = Consolidator::new(
            &quantized.labels,
            width,
            height,
            &quantized.palette,
            self.options.consolidate_options(),
        )?
        .run();

        Ok(Mosaic { width, height, quantized, consolidated })
    }

    /// Quantizes the image and consolidates its regions.
    ///
    /// # Errors
    /// Returns [`MosaicError::InvalidPitch`] if the board geometry gives a hole pitch
    /// of less than one pixel.
    pub fn run(&self) -> Result<Mosaic, MosaicError> {
        self.consolidate(self.quantize())
    }

    /// Quantizes the image in parallel and consolidates its regions.
    ///
    /// # Errors
    /// See [`MosaicPipeline::run`].
    #[cfg(feature = "threads")]
    pub fn run_par(&self) -> Result<Mosaic, MosaicError> {
        self.consolidate(self.quantize_par())
    }

    /// Like [`MosaicPipeline::run`], but checks `cancel` after the quantizer scan
    /// and after every consolidation pass.
    ///
    /// # Errors
    /// Returns [`MosaicError::Cancelled`] if `cancel` was triggered,
    /// otherwise see [`MosaicPipeline::run`].
    pub fn run_cancellable(&self, cancel: &CancelToken) -> Result<Mosaic, MosaicError> {
        let (width, height) = (self.grid.width(), self.grid.height());
        let quantized = indexed_palette_cancellable(self.grid, self.options.levels(), cancel)?;
        let consolidated = Consolidator::new(
            &quantized.labels,
            width,
            height,
            &quantized.palette,
            self.options.consolidate_options(),
        )?
        .run_cancellable(cancel)?;

        Ok(Mosaic { width, height, quantized, consolidated })
    }

    /// Runs the pipeline and returns the colors of each pixel of the consolidated mosaic.
    ///
    /// # Errors
    /// See [`MosaicPipeline::run`].
    pub fn mosaic_rgb(&self) -> Result<Vec<Srgb<u8>>, MosaicError> {
        let mosaic = self.run()?;
        indexed_to_rgb(mosaic.palette(), mosaic.labels())
    }

    /// Runs the pipeline and renders the consolidated mosaic into an [`RgbImage`].
    ///
    /// # Errors
    /// See [`MosaicPipeline::run`].
    #[cfg(feature = "image")]
    pub fn mosaic_rgbimage(&self) -> Result<RgbImage, MosaicError> {
        self.run()?.to_rgbimage()
    }

    /// Runs the pipeline in parallel and renders the consolidated mosaic into an [`RgbImage`].
    ///
    /// # Errors
    /// See [`MosaicPipeline::run`].
    #[cfg(all(feature = "image", feature = "threads"))]
    pub fn mosaic_rgbimage_par(&self) -> Result<RgbImage, MosaicError> {
        self.run_par()?.to_rgbimage()
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbaImage> for MosaicPipeline<'a> {
    type Error = MosaicError;

    fn try_from(image: &'a RgbaImage) -> Result<Self, Self::Error> {
        Ok(Self::new(PixelGrid::try_from(image)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn option_clamping() {
        let options = MosaicOptions::new()
            .color_count(2)
            .min_area_multiplier(100.0);
        assert_eq!(options.color_count, MIN_COLOR_COUNT);
        assert_eq!(options.min_area_multiplier, 10.0);

        let options = options.color_count(1000).min_area_multiplier(0.0);
        assert_eq!(options.color_count, MAX_COLOR_COUNT);
        assert_eq!(options.min_area_multiplier, 0.25);

        let options = options.min_area_multiplier(f64::NAN);
        assert_eq!(options.min_area_multiplier, MosaicOptions::DEFAULT_MIN_AREA_MULTIPLIER);
    }

    #[test]
    fn interactive_levels() {
        let options = MosaicOptions::new().color_count(MAX_COLOR_COUNT);
        assert_eq!(options.levels().get(), 6);

        // 256 colors stay below both caps
        let options = options.interactive(true);
        assert_eq!(options.max_levels, INTERACTIVE_MAX_LEVELS);
        assert_eq!(options.levels().get(), 6);
        assert_eq!(options.levels(), options.interactive(false).levels());
        assert_eq!(
            ChannelLevels::from_color_count(u16::MAX, options.max_levels).get(),
            INTERACTIVE_MAX_LEVELS
        );
    }

    #[test]
    fn consolidate_options_follow_geometry() {
        let options = MosaicOptions::new().min_area_multiplier(0.5).max_passes(9);
        let consolidate = options.consolidate_options();
        assert_eq!(consolidate.min_pixel_area, 128);
        assert_eq!(consolidate.hole_pitch, 16.0);
        assert_eq!(consolidate.max_passes, 9);
    }

    #[test]
    fn run_produces_compliant_mosaic() {
        let (w, h) = (96, 64);
        let rgba = random_rgba(w, h, 13);
        let grid = PixelGrid::new(&rgba, w, h).unwrap();
        let mosaic = MosaicPipeline::new(grid)
            .color_count(27)
            .min_area_multiplier(0.25)
            .max_passes(100)
            .run()
            .unwrap();

        assert_eq!(mosaic.quantized.levels.get(), 3);
        assert_eq!(mosaic.labels().len(), (w * h) as usize);
        assert!(mosaic.consolidated.converged);
        assert!(mosaic.labels().iter().all(|&l| (l as usize) < mosaic.palette().len()));
        assert_eq!(mosaic.to_rgb().len(), (w * h) as usize);
    }

    #[test]
    fn cancelled_run() {
        let (w, h) = (32, 32);
        let rgba = random_rgba(w, h, 4);
        let grid = PixelGrid::new(&rgba, w, h).unwrap();
        let pipeline = MosaicPipeline::new(grid);

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(pipeline.run_cancellable(&cancel), Err(MosaicError::Cancelled));

        let cancel = CancelToken::new();
        assert_eq!(pipeline.run_cancellable(&cancel), pipeline.run());
    }

    #[test]
    #[cfg(feature = "threads")]
    fn parallel_labels_match() {
        let (w, h) = (64, 40);
        let rgba = random_rgba(w, h, 8);
        let grid = PixelGrid::new(&rgba, w, h).unwrap();
        let pipeline = MosaicPipeline::new(grid);
        assert_eq!(pipeline.quantize().labels, pipeline.quantize_par().labels);
    }
}
